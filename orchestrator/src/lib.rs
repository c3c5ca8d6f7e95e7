//! Polling core for textile machine controllers
//!
//! This library polls dyeing and drying machines over Modbus TCP, keeps a
//! live snapshot of every machine, follows batches and recipe steps, tracks
//! alarms and hands everything worth keeping to injected persistence
//! collaborators.

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod state;
pub mod traits;
pub mod worker;

// Re-export commonly used types
pub use config::PollingConfig;
pub use core::{ActiveBatch, AlarmCatalog, AlarmTracker, ConnectionTracker, StepAnalyzer};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::Orchestrator;
pub use state::{Collaborators, SharedState};
pub use traits::{
    AdapterFactory, AlarmRepository, MachineAdapter, MachineRegistry, ProcessLogRepository, ProductionRepository,
    RecipeRepository, RegisterClient,
};
pub use worker::MachineWorker;
