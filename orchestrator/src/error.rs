//! Orchestrator-specific error types

use shared::{MachineType, SharedError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Transport failure talking to {endpoint}: {message}")]
    TransportError { endpoint: String, message: String },

    #[error("Device call to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Protocol error at register {address}: {message}")]
    ProtocolError { address: u16, message: String },

    #[error("Not connected to {endpoint}")]
    NotConnected { endpoint: String },

    #[error("Invalid recipe: {reason}")]
    InvalidRecipe { reason: String },

    #[error("Slot {slot} out of range {min}..={max}")]
    SlotOutOfRange { slot: u16, min: u16, max: u16 },

    #[error("Machine is running, {operation} refused")]
    MachineBusy { operation: String },

    #[error("{capability} is not supported by {machine_type} machines")]
    Unsupported {
        capability: String,
        machine_type: MachineType,
    },

    #[error("Persistence failed: {operation}: {message}")]
    PersistenceError { operation: String, message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn protocol(address: u16, message: impl Into<String>) -> Self {
        Self::ProtocolError {
            address,
            message: message.into(),
        }
    }

    /// Check `slot` against an inclusive range before touching the device
    pub fn check_slot(slot: u16, min: u16, max: u16) -> OrchestratorResult<()> {
        if (min..=max).contains(&slot) {
            Ok(())
        } else {
            Err(Self::SlotOutOfRange { slot, min, max })
        }
    }

    pub fn unsupported(capability: &str, machine_type: MachineType) -> Self {
        Self::Unsupported {
            capability: capability.to_string(),
            machine_type,
        }
    }

    pub fn persistence(operation: &str, message: impl Into<String>) -> Self {
        Self::PersistenceError {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
