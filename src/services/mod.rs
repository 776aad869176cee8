//! External collaborator module
//!
//! This module contains the capabilities the engine calls out to: session
//! storage and user notification.

pub mod notifier;
pub mod recorder;

// Re-export main types
pub use notifier::{completion_message, LogNotifier, Notifier};
pub use recorder::{JsonlSessionRecorder, SessionRecorder};

#[cfg(test)]
pub(crate) use recorder::MemoryRecorder;
