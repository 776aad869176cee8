//! State management module
//!
//! This module contains the countdown state, the session records it produces,
//! the store that owns the single live instance, and the host state shared by
//! HTTP handlers.

pub mod app_state;
pub mod session;
pub mod store;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use session::SessionRecord;
pub use store::{Listener, Subscription, TimerStore};
pub use timer_state::{format_time, Durations, TimerMode, TimerState};
