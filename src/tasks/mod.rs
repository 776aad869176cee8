//! Background tasks module
//!
//! This module contains the tick source that drives the countdown alongside
//! the HTTP server.

pub mod tick_source;

// Re-export main types
pub use tick_source::{IntervalTicker, TickCallback, TickSource};
