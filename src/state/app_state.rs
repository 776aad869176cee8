//! Host application state shared by the HTTP handlers

use std::time::Instant;
use tracing::info;

use crate::engine::{TimerEngine, TimerView};

/// State shared by every request: the one engine plus server metadata
pub struct AppState {
    pub engine: TimerEngine,
    /// Flip to the other mode whenever a countdown completes
    pub auto_switch: bool,
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(engine: TimerEngine, auto_switch: bool, port: u16, host: String) -> Self {
        Self {
            engine,
            auto_switch,
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Attach a new view for one consumer
    pub fn view(&self) -> TimerView {
        TimerView::attach(self.engine.clone())
    }

    /// Start the countdown, wiring the completion callback to the mode flip
    pub fn start_timer(&self, view: &TimerView) {
        if !self.auto_switch {
            view.start(|_| {});
            return;
        }

        let engine = self.engine.clone();
        view.start(move |record| {
            let next = record.kind.toggled();
            info!("Switching to {} after completed {} session", next.label(), record.kind.label());
            engine.switch_mode(next);
        });
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
