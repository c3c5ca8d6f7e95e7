//! Polling core logic
//!
//! Everything here is free of I/O. Time is passed in by the caller so each
//! piece can be driven tick by tick from tests.

pub mod alarms;
pub mod analyzer;
pub mod batch;
pub mod progress;
pub mod recipe;
pub mod state;

pub use alarms::{AlarmCatalog, AlarmChanges, AlarmTracker};
pub use analyzer::{StepAnalyzer, StepSample, StepUpdate};
pub use batch::{ActiveBatch, BatchTransition};
pub use state::ConnectionTracker;
