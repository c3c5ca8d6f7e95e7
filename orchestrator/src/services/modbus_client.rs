//! Modbus TCP register transport
//!
//! Wraps one `tokio_modbus` client context. Every request is bounded by the
//! device timeout so a hung controller cannot stall its polling worker.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use shared::{machine_debug, MachineConfig, MachineId};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::RegisterClient;

pub struct ModbusTcpClient {
    machine_id: MachineId,
    endpoint: String,
    unit_id: u8,
    timeout: Duration,
    context: Mutex<Option<Context>>,
}

impl ModbusTcpClient {
    pub fn new(machine: &MachineConfig, timeout: Duration) -> Self {
        Self {
            machine_id: machine.id,
            endpoint: machine.endpoint(),
            unit_id: machine.unit_id,
            timeout,
            context: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn resolve(&self) -> OrchestratorResult<SocketAddr> {
        let mut addresses = lookup_host(self.endpoint.as_str())
            .await
            .map_err(|e| self.transport(format!("cannot resolve: {e}")))?;
        addresses
            .next()
            .ok_or_else(|| self.transport("no address for endpoint"))
    }

    fn transport(&self, message: impl Into<String>) -> OrchestratorError {
        OrchestratorError::TransportError {
            endpoint: self.endpoint.clone(),
            message: message.into(),
        }
    }

    async fn bounded<T, F>(&self, request: F) -> OrchestratorResult<T>
    where
        F: Future<Output = OrchestratorResult<T>>,
    {
        timeout(self.timeout, request)
            .await
            .map_err(|_| OrchestratorError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout: self.timeout,
            })?
    }

    fn not_connected(&self) -> OrchestratorError {
        OrchestratorError::NotConnected {
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Flatten the transport and exception layers of a response
fn flatten<T>(
    address: u16,
    endpoint: &str,
    response: tokio_modbus::Result<T>,
) -> OrchestratorResult<T> {
    response
        .map_err(|e| OrchestratorError::TransportError {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?
        .map_err(|e| OrchestratorError::protocol(address, format!("modbus exception: {e}")))
}

#[async_trait]
impl RegisterClient for ModbusTcpClient {
    async fn connect(&self) -> OrchestratorResult<()> {
        let mut context = self.context.lock().await;
        if context.is_some() {
            return Ok(());
        }

        let address = self.bounded(self.resolve()).await?;
        let connected = self
            .bounded(async {
                tcp::connect_slave(address, Slave(self.unit_id))
                    .await
                    .map_err(|e| self.transport(e.to_string()))
            })
            .await?;

        machine_debug!(self.machine_id, "Modbus link open to {} (unit {})", address, self.unit_id);
        *context = Some(connected);
        Ok(())
    }

    async fn disconnect(&self) -> OrchestratorResult<()> {
        // Dropping the context closes the socket
        if self.context.lock().await.take().is_some() {
            machine_debug!(self.machine_id, "Modbus link to {} closed", self.endpoint);
        }
        Ok(())
    }

    async fn read_registers(&self, address: u16, count: u16) -> OrchestratorResult<Vec<u16>> {
        let mut guard = self.context.lock().await;
        let context = guard.as_mut().ok_or_else(|| self.not_connected())?;
        let words = self
            .bounded(async { flatten(address, &self.endpoint, context.read_holding_registers(address, count).await) })
            .await?;

        if words.len() < usize::from(count) {
            return Err(OrchestratorError::protocol(
                address,
                format!("expected {count} registers, got {}", words.len()),
            ));
        }
        Ok(words)
    }

    async fn read_coils(&self, address: u16, count: u16) -> OrchestratorResult<Vec<bool>> {
        let mut guard = self.context.lock().await;
        let context = guard.as_mut().ok_or_else(|| self.not_connected())?;
        self.bounded(async { flatten(address, &self.endpoint, context.read_coils(address, count).await) })
            .await
    }

    async fn write_registers(&self, address: u16, words: &[u16]) -> OrchestratorResult<()> {
        let mut guard = self.context.lock().await;
        let context = guard.as_mut().ok_or_else(|| self.not_connected())?;
        self.bounded(async { flatten(address, &self.endpoint, context.write_multiple_registers(address, words).await) })
            .await
    }

    async fn write_register(&self, address: u16, word: u16) -> OrchestratorResult<()> {
        let mut guard = self.context.lock().await;
        let context = guard.as_mut().ok_or_else(|| self.not_connected())?;
        self.bounded(async { flatten(address, &self.endpoint, context.write_single_register(address, word).await) })
            .await
    }

    async fn write_coil(&self, address: u16, value: bool) -> OrchestratorResult<()> {
        let mut guard = self.context.lock().await;
        let context = guard.as_mut().ok_or_else(|| self.not_connected())?;
        self.bounded(async { flatten(address, &self.endpoint, context.write_single_coil(address, value).await) })
            .await
    }
}
