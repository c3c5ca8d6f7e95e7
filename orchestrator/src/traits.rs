//! Trait definitions with mockall annotations for testing
//!
//! Every seam of the polling core is a trait here: the register transport,
//! the per-variant machine adapter, the factory choosing the variant, and the
//! persistence collaborators. Production implementations live in
//! `services`, the mocks generated here drive the tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{
    AlarmDefinition, AlarmHistoryState, BatchEndRecord, BatchSummary, ChemicalConsumption, MachineConfig,
    MachineId, MachineStatus, MachineType, PlcOperator, Recipe, StepRecord,
};

use crate::error::OrchestratorResult;

/// Raw register transport to one controller
///
/// Addresses are zero-based protocol addresses. Implementations bound every
/// call with their own timeout.
#[mockall::automock]
#[async_trait::async_trait]
pub trait RegisterClient: Send + Sync {
    /// Open the link; calling it on an open link is a no-op
    async fn connect(&self) -> OrchestratorResult<()>;

    /// Close the link; calling it on a closed link is a no-op
    async fn disconnect(&self) -> OrchestratorResult<()>;

    /// Read `count` holding registers starting at `address`
    async fn read_registers(&self, address: u16, count: u16) -> OrchestratorResult<Vec<u16>>;

    /// Read `count` coils starting at `address`
    async fn read_coils(&self, address: u16, count: u16) -> OrchestratorResult<Vec<bool>>;

    async fn write_registers(&self, address: u16, words: &[u16]) -> OrchestratorResult<()>;

    async fn write_register(&self, address: u16, word: u16) -> OrchestratorResult<()>;

    async fn write_coil(&self, address: u16, value: bool) -> OrchestratorResult<()>;
}

/// Lets several owners share one transport
#[async_trait::async_trait]
impl<T: RegisterClient + ?Sized> RegisterClient for Arc<T> {
    async fn connect(&self) -> OrchestratorResult<()> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> OrchestratorResult<()> {
        (**self).disconnect().await
    }

    async fn read_registers(&self, address: u16, count: u16) -> OrchestratorResult<Vec<u16>> {
        (**self).read_registers(address, count).await
    }

    async fn read_coils(&self, address: u16, count: u16) -> OrchestratorResult<Vec<bool>> {
        (**self).read_coils(address, count).await
    }

    async fn write_registers(&self, address: u16, words: &[u16]) -> OrchestratorResult<()> {
        (**self).write_registers(address, words).await
    }

    async fn write_register(&self, address: u16, word: u16) -> OrchestratorResult<()> {
        (**self).write_register(address, word).await
    }

    async fn write_coil(&self, address: u16, value: bool) -> OrchestratorResult<()> {
        (**self).write_coil(address, value).await
    }
}

/// Capability set every machine variant exposes
///
/// Variants that lack a capability return `OrchestratorError::Unsupported`
/// rather than silently succeeding.
#[mockall::automock]
#[async_trait::async_trait]
pub trait MachineAdapter: Send + Sync {
    /// Variant tag this adapter was built for
    fn machine_type(&self) -> MachineType;

    async fn connect(&self) -> OrchestratorResult<()>;

    async fn disconnect(&self) -> OrchestratorResult<()>;

    /// Read one live snapshot
    ///
    /// # Returns
    /// Device fields only; identity, connection state and derived fields are
    /// filled in by the polling worker. Fails when a required read fails.
    async fn read_live_status(&self) -> OrchestratorResult<MachineStatus>;

    /// Read the recipe currently loaded on the controller
    async fn read_recipe(&self) -> OrchestratorResult<Recipe>;

    /// Upload a recipe
    ///
    /// # Parameters
    /// - `recipe`: recipe to transfer, validated before any register is written
    /// - `slot`: recipe slot for variants that store several recipes
    async fn write_recipe(&self, recipe: &Recipe, slot: Option<u16>) -> OrchestratorResult<()>;

    /// Read the controller's recipe name table, keyed by 1-based slot
    ///
    /// Empty slots are left out.
    async fn read_recipe_names(&self) -> OrchestratorResult<BTreeMap<u16, String>>;

    /// Write one entry of the recipe name table (slot is 1-based)
    async fn write_recipe_name(&self, slot: u16, name: &str) -> OrchestratorResult<()>;

    async fn read_operators(&self) -> OrchestratorResult<Vec<PlcOperator>>;

    async fn read_operator(&self, slot: u8) -> OrchestratorResult<PlcOperator>;

    async fn write_operator(&self, operator: &PlcOperator) -> OrchestratorResult<()>;

    /// Utility totals of the batch that just finished
    async fn read_batch_summary(&self) -> OrchestratorResult<BatchSummary>;

    /// Zero the OEE counters (downtime and defective count)
    async fn reset_counters(&self) -> OrchestratorResult<()>;

    async fn increment_production_counter(&self) -> OrchestratorResult<()>;

    async fn acknowledge_alarm(&self) -> OrchestratorResult<()>;
}

/// Chooses and builds the adapter variant for a registry entry
#[mockall::automock]
pub trait AdapterFactory: Send + Sync {
    fn create(&self, machine: &MachineConfig) -> OrchestratorResult<Arc<dyn MachineAdapter>>;
}

/// Source of the machines to supervise
#[mockall::automock]
#[async_trait::async_trait]
pub trait MachineRegistry: Send + Sync {
    /// Enabled machines only
    async fn enabled_machines(&self) -> OrchestratorResult<Vec<MachineConfig>>;
}

/// Alarm catalog and alarm history
#[mockall::automock]
#[async_trait::async_trait]
pub trait AlarmRepository: Send + Sync {
    async fn load_definitions(&self) -> OrchestratorResult<Vec<AlarmDefinition>>;

    /// Append an ACTIVE / INACTIVE entry to the alarm history
    async fn write_alarm_history(
        &self,
        machine_id: MachineId,
        definition: &AlarmDefinition,
        state: AlarmHistoryState,
    ) -> OrchestratorResult<()>;
}

/// Batch and step production records
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProductionRepository: Send + Sync {
    /// Record that the batch in `status` started
    async fn start_batch(&self, status: &MachineStatus) -> OrchestratorResult<()>;

    async fn end_batch(&self, record: &BatchEndRecord) -> OrchestratorResult<()>;

    async fn update_batch_summary(
        &self,
        machine_id: MachineId,
        batch_number: &str,
        summary: BatchSummary,
    ) -> OrchestratorResult<()>;

    /// Append one finalized step record of the batch in `status`
    async fn log_step(&self, status: &MachineStatus, record: &StepRecord) -> OrchestratorResult<()>;

    async fn log_chemical_consumption(
        &self,
        status: &MachineStatus,
        consumption: &ChemicalConsumption,
    ) -> OrchestratorResult<()>;
}

/// Periodic process data log
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLogRepository: Send + Sync {
    /// Sample of a machine running a recipe
    async fn log_recipe_data(&self, status: &MachineStatus) -> OrchestratorResult<()>;

    /// Sample of a machine in manual operation
    async fn log_manual_data(&self, status: &MachineStatus) -> OrchestratorResult<()>;
}

/// Named recipes kept outside the controller
#[mockall::automock]
#[async_trait::async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn recipe_by_name(&self, name: &str) -> OrchestratorResult<Option<Recipe>>;
}
