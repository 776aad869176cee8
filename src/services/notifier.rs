//! User-facing completion messages

use tracing::info;

use crate::state::TimerMode;

/// Shows a short message to the user when a countdown completes
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Encouraging message naming the mode that just finished
pub fn completion_message(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Work => "Work session complete! Great focus, time for a break.",
        TimerMode::Break => "Break complete! Ready to get back to work?",
    }
}

/// Notifier that writes messages to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "focus_timer::notify", "{}", message);
    }
}
