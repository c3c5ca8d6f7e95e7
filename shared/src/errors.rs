//! Shared error types for the polling system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown machine type: {input}")]
    UnknownMachineType { input: String },
}
