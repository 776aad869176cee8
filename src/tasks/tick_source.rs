//! One-second tick source driving the countdown

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::debug;

use crate::{error::TickError, state::store::lock};

/// Callback fired once per tick
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// A repeating timer that can be started and stopped idempotently
pub trait TickSource: Send + Sync {
    /// Start ticking. Does nothing if already active, so there is never more
    /// than one schedule feeding the same callback.
    fn begin(&self, on_tick: TickCallback) -> Result<(), TickError>;

    /// Stop ticking and release the schedule. Does nothing if already stopped.
    fn end(&self);

    fn is_active(&self) -> bool;
}

/// Tick source backed by a tokio interval task
pub struct IntervalTicker {
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalTicker {
    /// Ticker firing once per second
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            task: Mutex::new(None),
        }
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for IntervalTicker {
    fn begin(&self, on_tick: TickCallback) -> Result<(), TickError> {
        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("tick source already active");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| TickError::NoRuntime)?;
        let period = self.period;
        *task = Some(runtime.spawn(async move {
            // First tick lands one full period after start
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                on_tick();
            }
        }));
        debug!(?period, "tick source started");
        Ok(())
    }

    fn end(&self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
            debug!("tick source stopped");
        }
    }

    fn is_active(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

/// Tick source advanced by hand, for deterministic tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ManualTicker {
    callback: Mutex<Option<TickCallback>>,
    begins: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ManualTicker {
    /// Fire `count` ticks, stopping early if the source is ended
    pub fn advance(&self, count: usize) {
        for _ in 0..count {
            let callback = lock(&self.callback).clone();
            match callback {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// How many times a schedule was actually created
    pub fn schedules(&self) -> usize {
        self.begins.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl TickSource for ManualTicker {
    fn begin(&self, on_tick: TickCallback) -> Result<(), TickError> {
        let mut callback = lock(&self.callback);
        if callback.is_none() {
            *callback = Some(on_tick);
            self.begins.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
        Ok(())
    }

    fn end(&self) {
        lock(&self.callback).take();
    }

    fn is_active(&self) -> bool {
        lock(&self.callback).is_some()
    }
}
