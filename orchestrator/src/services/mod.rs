//! Service implementations
//!
//! Production implementations of the traits in `traits`: the Modbus TCP
//! transport, the adapter factory and the JSON file backed registry and
//! persistence store.

pub mod adapter_factory;
pub mod file_store;
pub mod modbus_client;
pub mod registry;

#[cfg(test)]
mod tests;

pub use adapter_factory::ModbusAdapterFactory;
pub use file_store::JsonFileStore;
pub use modbus_client::ModbusTcpClient;
pub use registry::JsonMachineRegistry;
