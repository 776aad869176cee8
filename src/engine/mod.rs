//! Timer engine module
//!
//! The countdown state machine and the per-consumer views that observe it.

pub mod timer_engine;
pub mod view;

// Re-export main types
pub use timer_engine::TimerEngine;
pub use view::TimerView;
