//! Common test utilities and infrastructure
//!
//! Shared fixtures, a recording persistence store, a scriptable machine
//! adapter and builders used by the orchestrator test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{eventually, FakeAdapter, OrchestratorBuilder, Recorded, RecordingStore, WorkerHarness};
