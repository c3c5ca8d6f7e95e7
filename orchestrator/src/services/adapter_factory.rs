//! Adapter selection by machine type

use std::sync::Arc;
use std::time::Duration;

use shared::{MachineConfig, MachineType};

use crate::adapters::{DryingMachineAdapter, DyeingMachineAdapter};
use crate::error::OrchestratorResult;
use crate::services::ModbusTcpClient;
use crate::traits::{AdapterFactory, MachineAdapter};

/// Builds Modbus TCP backed adapters
pub struct ModbusAdapterFactory {
    device_timeout: Duration,
}

impl ModbusAdapterFactory {
    pub fn new(device_timeout: Duration) -> Self {
        Self { device_timeout }
    }
}

impl AdapterFactory for ModbusAdapterFactory {
    fn create(&self, machine: &MachineConfig) -> OrchestratorResult<Arc<dyn MachineAdapter>> {
        let client = ModbusTcpClient::new(machine, self.device_timeout);
        let profile = machine.profile();

        let adapter: Arc<dyn MachineAdapter> = match machine.machine_type {
            MachineType::Dyeing => Arc::new(DyeingMachineAdapter::new(machine.id, client, profile)),
            MachineType::Drying => Arc::new(DryingMachineAdapter::new(machine.id, client, profile)),
        };
        Ok(adapter)
    }
}
