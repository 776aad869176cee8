//! Focus Timer - A background focus/break countdown engine
//!
//! This library provides a single shared countdown that keeps ticking while
//! any number of views attach and detach, records finished and partial
//! sessions, and can be served over HTTP.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{TimerEngine, TimerView};
pub use error::{RecorderError, TickError};
pub use services::{Notifier, SessionRecorder};
pub use state::{AppState, SessionRecord, TimerMode, TimerState};
pub use tasks::TickSource;
pub use utils::signals::shutdown_signal;
