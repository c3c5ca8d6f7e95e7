//! Protocol adapters
//!
//! One adapter per machine family, all behind [`MachineAdapter`]. The two
//! controller programs share most of the live-status register map; what
//! differs (recipe storage, name table, operator table, optional reads) lives
//! in the variant modules.
//!
//! [`MachineAdapter`]: crate::traits::MachineAdapter

pub mod codec;
pub mod drying;
pub mod dyeing;
pub mod registers;

#[cfg(test)]
mod tests;

pub use drying::DryingMachineAdapter;
pub use dyeing::DyeingMachineAdapter;

use shared::{MachineId, MachineStatus};

use crate::error::OrchestratorResult;
use crate::traits::RegisterClient;
use registers::{optional, read_flag, read_text, read_word};

/// Live-status register map common to both controller programs
pub mod map {
    pub const STEP_NUMBER: u16 = 3000;
    pub const ALARM_NUMBER: u16 = 3001;
    pub const WATER_LEVEL: u16 = 3002;
    pub const RPM: u16 = 3003;
    pub const TEMPERATURE: u16 = 3004;
    pub const ORDER_NUMBER: u16 = 3016;
    pub const CUSTOMER_NUMBER: u16 = 3026;
    pub const BATCH_NUMBER: u16 = 3036;
    pub const OPERATOR_NAME: u16 = 3056;
    pub const RECIPE_NAME: u16 = 3071;
    pub const WATER_TOTAL: u16 = 3077;
    pub const ELECTRICITY_TOTAL: u16 = 3078;
    pub const STEAM_TOTAL: u16 = 3079;
    pub const RUNTIME_MINUTES: u16 = 3080;
    pub const DOWNTIME_SECONDS: u16 = 3081;
    pub const TOTAL_PRODUCTION: u16 = 3082;
    pub const DEFECTIVE_PRODUCTION: u16 = 3083;
    pub const ACTUAL_QUANTITY: u16 = 3084;
    pub const STEP_CONTROL_WORD: u16 = 3085;

    /// Words of each job text field
    pub const TEXT_WORDS: u16 = 5;

    /// Coil addresses
    pub mod coils {
        pub const RECIPE_MODE: u16 = 0;
        pub const PAUSED: u16 = 1;
        pub const IN_PRODUCTION: u16 = 2;
        pub const MANUAL_MODE: u16 = 3;
    }
}

/// Read the job text fields; each one is optional
pub(crate) async fn read_job_texts<C: RegisterClient + ?Sized>(
    client: &C,
    machine_id: MachineId,
    status: &mut MachineStatus,
) {
    status.order_number = optional(
        machine_id,
        "order_number",
        read_text(client, map::ORDER_NUMBER, map::TEXT_WORDS).await,
    );
    status.customer_number = optional(
        machine_id,
        "customer_number",
        read_text(client, map::CUSTOMER_NUMBER, map::TEXT_WORDS).await,
    );
    status.batch_number = optional(
        machine_id,
        "batch_number",
        read_text(client, map::BATCH_NUMBER, map::TEXT_WORDS).await,
    );
    status.operator_name = optional(
        machine_id,
        "operator_name",
        read_text(client, map::OPERATOR_NAME, map::TEXT_WORDS).await,
    );
    status.recipe_name = optional(
        machine_id,
        "recipe_name",
        read_text(client, map::RECIPE_NAME, map::TEXT_WORDS).await,
    );
}

/// Read the process values shown on the live screen; each one is optional
pub(crate) async fn read_process_values<C: RegisterClient + ?Sized>(
    client: &C,
    machine_id: MachineId,
    status: &mut MachineStatus,
) {
    status.rpm = optional(machine_id, "rpm", read_word(client, map::RPM).await);
    status.temperature = optional(machine_id, "temperature", read_word(client, map::TEMPERATURE).await) as i16;
}

/// Read utility totals, production counters and mode coils; all required
pub(crate) async fn read_counters<C: RegisterClient + ?Sized>(
    client: &C,
    status: &mut MachineStatus,
) -> OrchestratorResult<()> {
    status.electricity_total = u32::from(read_word(client, map::ELECTRICITY_TOTAL).await?);
    status.steam_total = u32::from(read_word(client, map::STEAM_TOTAL).await?);
    status.runtime_minutes = u32::from(read_word(client, map::RUNTIME_MINUTES).await?);
    status.in_production = read_flag(client, map::coils::IN_PRODUCTION).await?;
    status.downtime_seconds = u32::from(read_word(client, map::DOWNTIME_SECONDS).await?);
    status.total_production = u32::from(read_word(client, map::TOTAL_PRODUCTION).await?);
    status.defective_production = u32::from(read_word(client, map::DEFECTIVE_PRODUCTION).await?);
    status.actual_quantity = u32::from(read_word(client, map::ACTUAL_QUANTITY).await?);
    status.manual_mode = read_flag(client, map::coils::MANUAL_MODE).await?;
    Ok(())
}
