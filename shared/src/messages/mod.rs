//! Message types published by the polling core
//!
//! - `events`: per-machine state changes fanned out to subscribers
//! - `notices`: short operator-facing notices (connection lost, alarm raised)

pub mod events;
pub mod notices;

pub use events::MachineEvent;
pub use notices::{LiveNotice, NoticeKind};
