//! Machine registry read from a JSON file

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use shared::MachineConfig;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::MachineRegistry;

/// Registry file holding a JSON array of machine entries
pub struct JsonMachineRegistry {
    path: PathBuf,
}

impl JsonMachineRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MachineRegistry for JsonMachineRegistry {
    async fn enabled_machines(&self) -> OrchestratorResult<Vec<MachineConfig>> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| OrchestratorError::ConfigurationError {
                field: format!("machine registry {}: {e}", self.path.display()),
            })?;
        let machines: Vec<MachineConfig> = serde_json::from_str(&content)?;
        let total = machines.len();

        let enabled: Vec<MachineConfig> = machines.into_iter().filter(|machine| machine.enabled).collect();
        debug!("Registry {}: {} of {} machines enabled", self.path.display(), enabled.len(), total);
        Ok(enabled)
    }
}
