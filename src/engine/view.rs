//! Per-consumer binding onto the shared timer

use std::sync::{Arc, Mutex};

use super::TimerEngine;
use crate::state::{store::lock, SessionRecord, Subscription, TimerMode, TimerState};

/// A live view of the engine for one consumer.
///
/// Attaching subscribes and captures the current state; dropping the view
/// (on any path, including unwinding) unsubscribes.
pub struct TimerView {
    engine: TimerEngine,
    latest: Arc<Mutex<TimerState>>,
    _subscription: Subscription,
}

impl TimerView {
    pub fn attach(engine: TimerEngine) -> Self {
        let latest = Arc::new(Mutex::new(TimerState::default()));
        let sink = Arc::clone(&latest);
        // The listener receives the current state before attach returns
        let (_, subscription) = engine.attach(move |state| {
            *lock(&sink) = state.clone();
        });

        Self {
            engine,
            latest,
            _subscription: subscription,
        }
    }

    /// Latest state seen by this view
    pub fn snapshot(&self) -> TimerState {
        lock(&self.latest).clone()
    }

    pub fn formatted_time(&self) -> String {
        lock(&self.latest).formatted_time()
    }

    pub fn progress_percentage(&self) -> f64 {
        lock(&self.latest).progress_percentage()
    }

    /// Additional listener tied to the engine, independent of this view's own.
    /// It receives the current state first, then every later change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        let (_, subscription) = self.engine.attach(listener);
        subscription
    }

    pub fn start<F>(&self, on_complete: F)
    where
        F: FnOnce(&SessionRecord) + Send + 'static,
    {
        self.engine.start(on_complete);
    }

    pub fn pause(&self) {
        self.engine.pause();
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn switch_mode(&self, mode: TimerMode) {
        self.engine.switch_mode(mode);
    }

    pub fn update_settings(&self, work_minutes: u32, break_minutes: u32) {
        self.engine.update_settings(work_minutes, break_minutes);
    }

    /// Detach explicitly; equivalent to dropping the view
    pub fn detach(self) {}
}
