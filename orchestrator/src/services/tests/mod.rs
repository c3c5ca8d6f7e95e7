//! Service-specific tests
//!
//! Each service has its own test file; shared fixtures live in `common`.

#[cfg(test)]
mod file_store;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use shared::{MachineConfig, MachineStatus, MachineType};
    use tempfile::TempDir;

    use crate::services::JsonFileStore;

    /// Store rooted in a fresh temporary directory
    pub fn temp_store() -> (JsonFileStore, TempDir) {
        let dir = TempDir::new().expect("temporary directory");
        (JsonFileStore::new(dir.path()), dir)
    }

    /// Snapshot of a dyeing machine running `batch`
    pub fn running_status(batch: &str) -> MachineStatus {
        let machine = MachineConfig::new(7, "BY-7", MachineType::Dyeing, "10.0.0.7");
        MachineStatus {
            recipe_mode: true,
            batch_number: batch.to_string(),
            recipe_name: "NAVY".to_string(),
            step_number: 4,
            temperature: 82,
            ..MachineStatus::for_machine(&machine)
        }
    }
}
