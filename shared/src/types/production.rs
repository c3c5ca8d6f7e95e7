//! Alarm, operator and batch records exchanged with persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::MachineId;

/// Catalog entry describing an alarm number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmDefinition {
    pub id: u32,
    pub number: u16,
    /// Higher is more severe
    pub severity: u8,
    pub text: String,
}

/// State written to the alarm history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmHistoryState {
    Active,
    Inactive,
}

impl fmt::Display for AlarmHistoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmHistoryState::Active => write!(f, "ACTIVE"),
            AlarmHistoryState::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// Operator credentials stored in a controller slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlcOperator {
    /// 0-based slot in the operator table
    pub slot: u8,
    pub name: String,
    pub user_id: u16,
    pub password: u16,
}

/// Utility totals the controller accumulated for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub water: u32,
    pub electricity: u32,
    pub steam: u32,
}

/// Aggregates persisted when a batch closes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEndRecord {
    pub machine_id: MachineId,
    pub batch_number: String,
    pub actual_quantity: u32,
    pub alarm_secs: u32,
    pub pause_secs: u32,
    /// Alarm plus pause time
    pub downtime_secs: u32,
    pub theoretical_secs: u32,
    pub ended_at: DateTime<Utc>,
}
