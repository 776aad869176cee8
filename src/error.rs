//! Error types for the timer engine and its collaborators

use thiserror::Error;

/// Failure to schedule the one-second tick
#[derive(Debug, Error)]
pub enum TickError {
    #[error("no async runtime available to drive the tick source")]
    NoRuntime,
}

/// Failure while persisting a session record
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to write session log: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize session record: {0}")]
    Serialize(#[from] serde_json::Error),
}
