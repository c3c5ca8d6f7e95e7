//! Machine events fanned out to subscribers

use serde::{Deserialize, Serialize};

use super::notices::LiveNotice;
use crate::types::{MachineId, MachineStatus};

/// Event published by a polling worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineEvent {
    /// A tick finished and the cached snapshot was replaced
    StatusRefreshed {
        machine_id: MachineId,
        status: Box<MachineStatus>,
    },
    ConnectionStateChanged {
        machine_id: MachineId,
        status: Box<MachineStatus>,
    },
    /// The visible alarm (flag or number) changed
    AlarmStateChanged {
        machine_id: MachineId,
        status: Box<MachineStatus>,
    },
    AlarmRaised {
        machine_id: MachineId,
        alarm_number: u16,
        text: String,
    },
    AlarmCleared {
        machine_id: MachineId,
        alarm_number: u16,
        text: String,
    },
    Notice(LiveNotice),
}

impl MachineEvent {
    pub fn machine_id(&self) -> Option<MachineId> {
        match self {
            MachineEvent::StatusRefreshed { machine_id, .. }
            | MachineEvent::ConnectionStateChanged { machine_id, .. }
            | MachineEvent::AlarmStateChanged { machine_id, .. }
            | MachineEvent::AlarmRaised { machine_id, .. }
            | MachineEvent::AlarmCleared { machine_id, .. } => Some(*machine_id),
            MachineEvent::Notice(notice) => notice.machine_id,
        }
    }
}
