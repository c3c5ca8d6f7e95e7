//! Shared types for the textile machine polling system
//!
//! Holds the domain model exchanged between the polling core and its
//! collaborators: machine registry entries, live status snapshots, recipes,
//! step records, alarm definitions and the events published to subscribers.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{LiveNotice, MachineEvent, NoticeKind};
