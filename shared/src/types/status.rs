//! Live status snapshot of one machine

use serde::{Deserialize, Serialize};

use super::{ConnectionState, MachineConfig, MachineId};

/// Point-in-time view of a machine
///
/// The adapter fills the device fields, the polling worker fills identity,
/// connection state, step name, progress and the visible alarm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub machine_id: MachineId,
    pub machine_name: String,
    pub connection_state: ConnectionState,

    pub recipe_mode: bool,
    pub manual_mode: bool,
    pub paused: bool,
    pub in_production: bool,

    pub has_alarm: bool,
    pub alarm_number: u16,
    pub alarm_text: String,

    pub step_number: u16,
    pub step_control_word: u16,
    pub step_name: String,
    /// Parameter words of the step the controller is executing
    pub step_data: Vec<i16>,
    /// Batch progress, 0..=100
    pub process_percentage: u8,

    pub water_level: u16,
    pub rpm: u16,
    pub temperature: i16,

    pub water_total: u32,
    pub electricity_total: u32,
    pub steam_total: u32,
    pub runtime_minutes: u32,
    pub downtime_seconds: u32,

    pub total_production: u32,
    pub defective_production: u32,
    pub actual_quantity: u32,

    pub order_number: String,
    pub customer_number: String,
    pub batch_number: String,
    pub operator_name: String,
    pub recipe_name: String,
}

impl MachineStatus {
    /// Initial cache entry for a registered machine
    pub fn for_machine(machine: &MachineConfig) -> Self {
        Self {
            machine_id: machine.id,
            machine_name: machine.name.clone(),
            connection_state: ConnectionState::Disconnected,
            ..Default::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// A batch is loaded when the controller reports a non-empty batch number
    pub fn has_batch(&self) -> bool {
        !self.batch_number.trim().is_empty()
    }
}
