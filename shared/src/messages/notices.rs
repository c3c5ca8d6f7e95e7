//! Operator-facing live notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MachineId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveNotice {
    pub machine_id: Option<MachineId>,
    /// Display name of whatever raised the notice
    pub source: String,
    pub message: String,
    pub kind: NoticeKind,
    pub at: DateTime<Utc>,
}

impl LiveNotice {
    pub fn new(
        machine_id: Option<MachineId>,
        source: impl Into<String>,
        message: impl Into<String>,
        kind: NoticeKind,
    ) -> Self {
        Self {
            machine_id,
            source: source.into(),
            message: message.into(),
            kind,
            at: Utc::now(),
        }
    }
}
