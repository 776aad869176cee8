//! The focus timer state machine

use std::sync::{Arc, Mutex, Weak};
use chrono::Utc;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    services::{completion_message, Notifier, SessionRecorder},
    state::{store::lock, Durations, SessionRecord, Subscription, TimerMode, TimerState, TimerStore},
    tasks::TickSource,
};

/// Callback run once when a started countdown reaches zero
type CompletionCallback = Box<dyn FnOnce(&SessionRecord) + Send>;

/// Facade over the timer store, the tick source and the collaborators.
///
/// Cheap to clone; every clone drives the same countdown. Operations never
/// fail: misuse such as starting twice is absorbed as a no-op.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: TimerStore,
    ticker: Arc<dyn TickSource>,
    recorder: Arc<dyn SessionRecorder>,
    notifier: Arc<dyn Notifier>,
    /// Serializes operations and ticks
    control: Mutex<Control>,
    /// Ordered hand-off to the recorder, created on first use inside a runtime
    recording: Mutex<Option<RecordQueue>>,
}

struct RecordQueue {
    tx: mpsc::UnboundedSender<SessionRecord>,
    worker: JoinHandle<()>,
}

impl RecordQueue {
    /// Writer task feeding records to the recorder one at a time, in order,
    /// on the blocking pool
    fn spawn(runtime: &Handle, recorder: Arc<dyn SessionRecorder>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionRecord>();
        let worker = runtime.spawn(async move {
            while let Some(record) = rx.recv().await {
                let recorder = Arc::clone(&recorder);
                let written =
                    tokio::task::spawn_blocking(move || write_record(recorder.as_ref(), &record)).await;
                if let Err(e) = written {
                    error!("Session recorder task failed: {}", e);
                }
            }
            debug!("Session record queue closed");
        });
        Self { tx, worker }
    }
}

#[derive(Default)]
struct Control {
    on_complete: Option<CompletionCallback>,
    /// Bumped on every start so ticks from an older schedule are ignored
    generation: u64,
}

impl TimerEngine {
    pub fn new(
        durations: Durations,
        ticker: Arc<dyn TickSource>,
        recorder: Arc<dyn SessionRecorder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!(
            work_seconds = durations.work_seconds,
            break_seconds = durations.break_seconds,
            "Creating timer engine"
        );
        Self {
            inner: Arc::new(EngineInner {
                store: TimerStore::new(TimerState::new(durations)),
                ticker,
                recorder,
                notifier,
                control: Mutex::new(Control::default()),
                recording: Mutex::new(None),
            }),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> TimerState {
        self.inner.store.get()
    }

    /// Receive a snapshot after every change
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    /// Subscribe, delivering the current state to the listener first
    pub fn attach<F>(&self, listener: F) -> (TimerState, Subscription)
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        self.inner.store.attach(listener)
    }

    /// Number of listeners currently attached
    pub fn subscriber_count(&self) -> usize {
        self.inner.store.subscriber_count()
    }

    /// Start counting down. Ignored while already running.
    pub fn start<F>(&self, on_complete: F)
    where
        F: FnOnce(&SessionRecord) + Send + 'static,
    {
        let inner = &self.inner;
        let mut control = lock(&inner.control);
        if inner.store.get().is_running {
            debug!("start ignored, timer already running");
            return;
        }

        // Drop any schedule left over from an earlier session
        inner.ticker.end();
        let generation = control.generation.wrapping_add(1);
        let weak: Weak<EngineInner> = Arc::downgrade(inner);
        let on_tick = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.tick(generation);
            }
        });
        if let Err(e) = inner.ticker.begin(on_tick) {
            warn!("Cannot start countdown: {}", e);
            return;
        }

        control.generation = generation;
        control.on_complete = Some(Box::new(on_complete));
        let state = inner.store.apply(|state| {
            if state.remaining_seconds == 0 {
                state.resync();
            }
            state.is_running = true;
            state.session_started_at = Some(Utc::now());
            state.clone()
        });
        info!(
            mode = state.mode.label(),
            remaining = state.remaining_seconds,
            "Countdown started"
        );
    }

    /// Stop the countdown, banking any partial progress. Ignored while idle.
    ///
    /// Credit is cumulative for the loaded countdown: pausing, resuming and
    /// pausing again reports all time elapsed since the last reset or mode
    /// switch, not just the time since the resume.
    pub fn pause(&self) {
        let record = {
            let mut control = lock(&self.inner.control);
            if !self.inner.store.get().is_running {
                debug!("pause ignored, timer idle");
                return;
            }
            self.inner.ticker.end();
            control.on_complete = None;
            self.inner.store.apply(|state| state.halt(Utc::now()))
        };
        info!("Countdown paused");
        self.inner.save(record);
    }

    /// Pause, then reload the countdown for the current mode
    pub fn reset(&self) {
        let record = {
            let mut control = lock(&self.inner.control);
            self.inner.ticker.end();
            control.on_complete = None;
            self.inner.store.apply(|state| {
                let record = halt_if_running(state);
                state.resync();
                record
            })
        };
        info!("Countdown reset");
        self.inner.save(record);
    }

    /// Pause (banking progress for the old mode), then load `mode`
    pub fn switch_mode(&self, mode: TimerMode) {
        let record = {
            let mut control = lock(&self.inner.control);
            self.inner.ticker.end();
            control.on_complete = None;
            self.inner.store.apply(|state| {
                let record = halt_if_running(state);
                state.mode = mode;
                state.resync();
                record
            })
        };
        info!(mode = mode.label(), "Switched mode");
        self.inner.save(record);
    }

    /// Wait until every session handed off so far has reached the recorder
    pub async fn flush_records(&self) {
        let queue = lock(&self.inner.recording).take();
        if let Some(RecordQueue { tx, worker }) = queue {
            drop(tx);
            if let Err(e) = worker.await {
                warn!("Session record queue ended abnormally: {}", e);
            }
        }
    }

    /// Change configured durations.
    ///
    /// An idle countdown shows the new duration immediately; a running one
    /// finishes with the length it started with.
    pub fn update_settings(&self, work_minutes: u32, break_minutes: u32) {
        let durations = Durations::from_minutes(work_minutes, break_minutes);
        let _control = lock(&self.inner.control);
        let running = self.inner.store.apply(|state| {
            state.work_duration_seconds = durations.work_seconds;
            state.break_duration_seconds = durations.break_seconds;
            if !state.is_running {
                state.resync();
            }
            state.is_running
        });
        info!(
            work_seconds = durations.work_seconds,
            break_seconds = durations.break_seconds,
            deferred = running,
            "Settings updated"
        );
    }
}

impl EngineInner {
    fn tick(&self, generation: u64) {
        let finished = {
            let mut control = lock(&self.control);
            if control.generation != generation {
                return;
            }
            let current = self.store.get();
            if !current.is_running {
                // Stray tick from a schedule that outlived its session
                self.ticker.end();
                return;
            }
            if current.remaining_seconds > 1 {
                self.store
                    .apply(|state| state.remaining_seconds = state.remaining_seconds.saturating_sub(1));
                return;
            }

            self.ticker.end();
            let record = self.store.apply(|state| {
                state.remaining_seconds = 0;
                state.is_running = false;
                SessionRecord::completed(state.mode, state.total_seconds, Utc::now())
            });
            (record, control.on_complete.take())
        };

        let (record, on_complete) = finished;
        info!(
            mode = record.kind.label(),
            minutes = record.duration_minutes,
            "Countdown completed"
        );
        self.save(Some(record.clone()));
        self.notifier.notify(completion_message(record.kind));
        if let Some(on_complete) = on_complete {
            on_complete(&record);
        }
    }

    /// Hand a session to the recorder without waiting on it
    fn save(&self, record: Option<SessionRecord>) {
        let Some(record) = record else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            // Outside a runtime there is nothing to hand off to
            write_record(self.recorder.as_ref(), &record);
            return;
        };

        let mut queue = lock(&self.recording);
        if queue.as_ref().map_or(true, |queue| queue.tx.is_closed()) {
            *queue = Some(RecordQueue::spawn(&runtime, Arc::clone(&self.recorder)));
        }
        if let Some(queue) = queue.as_ref() {
            if let Err(e) = queue.tx.send(record) {
                error!("Dropped {} session, record queue closed", e.0.kind.label());
            }
        }
    }
}

fn write_record(recorder: &dyn SessionRecorder, record: &SessionRecord) {
    if let Err(e) = recorder.record(record) {
        error!("Failed to record {} session: {}", record.kind.label(), e);
    }
}

fn halt_if_running(state: &mut TimerState) -> Option<SessionRecord> {
    if state.is_running {
        state.halt(Utc::now())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{RecorderError, TickError},
        services::MemoryRecorder,
        tasks::{tick_source::ManualTicker, TickCallback},
    };
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    };

    #[derive(Default)]
    struct CountingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        engine: TimerEngine,
        ticker: Arc<ManualTicker>,
        recorder: Arc<MemoryRecorder>,
        notifier: Arc<CountingNotifier>,
    }

    fn harness(work_seconds: u64, break_seconds: u64) -> Harness {
        let ticker = Arc::new(ManualTicker::default());
        let recorder = Arc::new(MemoryRecorder::new());
        let notifier = Arc::new(CountingNotifier::default());
        let engine = TimerEngine::new(
            Durations::new(work_seconds, break_seconds),
            ticker.clone(),
            recorder.clone(),
            notifier.clone(),
        );
        Harness {
            engine,
            ticker,
            recorder,
            notifier,
        }
    }

    fn assert_bounds(state: &TimerState) {
        assert!(state.remaining_seconds <= state.total_seconds);
        if state.is_running {
            assert!(state.session_started_at.is_some());
        }
    }

    #[test]
    fn test_start_twice_keeps_single_schedule() {
        let h = harness(300, 60);
        h.engine.start(|_| {});
        h.engine.start(|_| {});
        assert_eq!(h.ticker.schedules(), 1);

        h.ticker.advance(3);
        assert_eq!(h.engine.snapshot().remaining_seconds, 297);
    }

    #[test]
    fn test_completion_records_full_session() {
        let h = harness(1, 60);
        let completions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completions);
        h.engine.start(move |record| {
            assert!(record.completed);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.ticker.advance(5);

        let state = h.engine.snapshot();
        assert!(!state.is_running);
        assert_eq!(state.remaining_seconds, 0);
        assert!(!h.ticker.is_active());

        let sessions = h.recorder.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].kind, TimerMode::Work);
        assert_eq!(sessions[0].duration_minutes, 1);
        assert!(sessions[0].completed);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(
            *h.notifier.messages.lock().unwrap(),
            vec![completion_message(TimerMode::Work).to_string()]
        );
    }

    #[test]
    fn test_partial_save_rounds_up() {
        let h = harness(300, 60);
        h.engine.start(|_| {});
        h.ticker.advance(61);
        h.engine.pause();

        let sessions = h.recorder.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_minutes, 2);
        assert!(!sessions[0].completed);
        assert!(!h.engine.snapshot().is_running);
        assert_eq!(h.engine.snapshot().remaining_seconds, 239);
    }

    #[test]
    fn test_second_pause_credits_whole_countdown() {
        let h = harness(300, 60);
        h.engine.start(|_| {});
        h.ticker.advance(30);
        h.engine.pause();
        h.engine.start(|_| {});
        h.ticker.advance(70);
        h.engine.pause();

        let minutes: Vec<u32> = h
            .recorder
            .sessions()
            .iter()
            .map(|s| s.duration_minutes)
            .collect();
        assert_eq!(minutes, vec![1, 2]);
        assert_eq!(h.engine.snapshot().remaining_seconds, 200);
    }

    #[test]
    fn test_pause_without_elapsed_time_records_nothing() {
        let h = harness(300, 60);
        h.engine.start(|_| {});
        h.engine.pause();
        assert!(h.recorder.sessions().is_empty());
    }

    #[test]
    fn test_pause_while_idle_is_a_no_op() {
        let h = harness(300, 60);
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        let _sub = h.engine.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let before = h.engine.snapshot();
        h.engine.pause();
        assert_eq!(h.engine.snapshot(), before);
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
        assert!(h.recorder.sessions().is_empty());
    }

    #[test]
    fn test_switch_mode_banks_old_mode() {
        let h = harness(300, 120);
        h.engine.start(|_| {});
        h.ticker.advance(30);
        h.engine.switch_mode(TimerMode::Break);

        let sessions = h.recorder.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].kind, TimerMode::Work);
        assert_eq!(sessions[0].duration_minutes, 1);
        assert!(!sessions[0].completed);

        let state = h.engine.snapshot();
        assert_eq!(state.mode, TimerMode::Break);
        assert!(!state.is_running);
        assert_eq!(state.remaining_seconds, 120);
        assert_eq!(state.total_seconds, 120);
        assert!(state.session_started_at.is_none());
        assert!(!h.ticker.is_active());
    }

    #[test]
    fn test_reset_without_run_records_nothing() {
        let h = harness(300, 60);
        h.engine.reset();
        assert!(h.recorder.sessions().is_empty());
        assert_eq!(h.engine.snapshot().remaining_seconds, 300);
    }

    #[test]
    fn test_reset_mid_run_banks_and_reloads() {
        let h = harness(300, 60);
        h.engine.start(|_| {});
        h.ticker.advance(90);
        h.engine.reset();

        assert_eq!(h.recorder.sessions().len(), 1);
        let state = h.engine.snapshot();
        assert_eq!(state.remaining_seconds, 300);
        assert_eq!(state.total_seconds, 300);
        assert!(state.session_started_at.is_none());
    }

    #[test]
    fn test_settings_wait_for_running_session() {
        let h = harness(1500, 300);
        h.engine.start(|_| {});
        h.ticker.advance(10);
        h.engine.update_settings(50, 10);

        let state = h.engine.snapshot();
        assert_eq!(state.remaining_seconds, 1490);
        assert_eq!(state.total_seconds, 1500);
        assert_eq!(state.work_duration_seconds, 3000);

        h.engine.reset();
        let state = h.engine.snapshot();
        assert_eq!(state.remaining_seconds, 3000);
        assert_eq!(state.total_seconds, 3000);
    }

    #[test]
    fn test_settings_apply_immediately_when_idle() {
        let h = harness(1500, 300);
        h.engine.update_settings(40, 0);

        let state = h.engine.snapshot();
        assert_eq!(state.remaining_seconds, 2400);
        assert_eq!(state.total_seconds, 2400);
        assert_eq!(state.break_duration_seconds, 60);
    }

    #[test]
    fn test_restart_after_completion_reloads_duration() {
        let h = harness(2, 60);
        h.engine.start(|_| {});
        h.ticker.advance(2);
        assert_eq!(h.engine.snapshot().remaining_seconds, 0);

        h.engine.start(|_| {});
        let state = h.engine.snapshot();
        assert!(state.is_running);
        assert_eq!(state.remaining_seconds, 2);
        assert_eq!(state.total_seconds, 2);
    }

    #[test]
    fn test_completion_callback_can_drive_engine() {
        let h = harness(1, 60);
        let engine = h.engine.clone();
        h.engine
            .start(move |record| engine.switch_mode(record.kind.toggled()));
        h.ticker.advance(1);

        let state = h.engine.snapshot();
        assert_eq!(state.mode, TimerMode::Break);
        assert_eq!(state.remaining_seconds, 60);
        assert_eq!(h.recorder.sessions().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_all_subscribers() {
        let h = harness(300, 60);
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen_a);
        let _a = h.engine.subscribe(move |s| sink.lock().unwrap().push(s.clone()));
        let sink = Arc::clone(&seen_b);
        let _b = h.engine.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

        h.engine.start(|_| {});
        h.ticker.advance(1);
        h.engine.pause();

        let a = seen_a.lock().unwrap();
        let b = seen_b.lock().unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(*a, *b);
        assert!(a[0].is_running);
        assert_eq!(a[1].remaining_seconds, 299);
        assert!(!a[2].is_running);
    }

    #[test]
    fn test_invariants_hold_across_operations() {
        let h = harness(3, 2);
        let _sub = h.engine.subscribe(|s| assert_bounds(s));

        h.engine.start(|_| {});
        h.ticker.advance(1);
        h.engine.update_settings(1, 1);
        h.ticker.advance(1);
        h.engine.switch_mode(TimerMode::Break);
        h.engine.start(|_| {});
        h.ticker.advance(10);
        h.engine.reset();
        h.engine.pause();
        assert_bounds(&h.engine.snapshot());
    }

    struct FailingRecorder;

    impl SessionRecorder for FailingRecorder {
        fn record(&self, _session: &SessionRecord) -> Result<(), RecorderError> {
            Err(RecorderError::Io(std::io::Error::other("storage unavailable")))
        }
    }

    #[test]
    fn test_recorder_failure_leaves_state_committed() {
        let ticker = Arc::new(ManualTicker::default());
        let engine = TimerEngine::new(
            Durations::new(1, 60),
            ticker.clone(),
            Arc::new(FailingRecorder),
            Arc::new(CountingNotifier::default()),
        );
        engine.start(|_| {});
        ticker.advance(1);

        let state = engine.snapshot();
        assert!(!state.is_running);
        assert_eq!(state.remaining_seconds, 0);
        engine.reset();
        assert_eq!(engine.snapshot().remaining_seconds, 1);
    }

    struct BrokenTicker;

    impl TickSource for BrokenTicker {
        fn begin(&self, _on_tick: TickCallback) -> Result<(), TickError> {
            Err(TickError::NoRuntime)
        }
        fn end(&self) {}
        fn is_active(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_unschedulable_tick_acts_like_pause() {
        let recorder = Arc::new(MemoryRecorder::new());
        let engine = TimerEngine::new(
            Durations::new(300, 60),
            Arc::new(BrokenTicker),
            recorder.clone(),
            Arc::new(CountingNotifier::default()),
        );
        let before = engine.snapshot();
        engine.start(|_| {});
        assert_eq!(engine.snapshot(), before);
        assert!(recorder.sessions().is_empty());
    }

    struct SlowRecorder {
        delay: Duration,
        sessions: Mutex<Vec<SessionRecord>>,
    }

    impl SlowRecorder {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                sessions: Mutex::new(Vec::new()),
            }
        }
    }

    impl SessionRecorder for SlowRecorder {
        fn record(&self, session: &SessionRecord) -> Result<(), RecorderError> {
            std::thread::sleep(self.delay);
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }
    }

    fn slow_engine(delay: Duration) -> (TimerEngine, Arc<ManualTicker>, Arc<SlowRecorder>) {
        let ticker = Arc::new(ManualTicker::default());
        let recorder = Arc::new(SlowRecorder::new(delay));
        let engine = TimerEngine::new(
            Durations::new(300, 120),
            ticker.clone(),
            recorder.clone(),
            Arc::new(CountingNotifier::default()),
        );
        (engine, ticker, recorder)
    }

    #[tokio::test]
    async fn test_slow_recorder_does_not_hold_up_pause() {
        let (engine, ticker, recorder) = slow_engine(Duration::from_millis(800));
        engine.start(|_| {});
        ticker.advance(61);

        let began = Instant::now();
        engine.pause();
        assert!(
            began.elapsed() < Duration::from_millis(100),
            "pause took {:?}",
            began.elapsed()
        );
        assert!(!engine.snapshot().is_running);

        engine.flush_records().await;
        let sessions = recorder.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_minutes, 2);
        assert!(!sessions[0].completed);
    }

    #[tokio::test]
    async fn test_queued_records_keep_their_order() {
        let (engine, ticker, recorder) = slow_engine(Duration::from_millis(50));
        engine.start(|_| {});
        ticker.advance(61);
        engine.switch_mode(TimerMode::Break);
        engine.start(|_| {});
        ticker.advance(30);
        engine.pause();

        engine.flush_records().await;
        let kinds: Vec<TimerMode> = recorder
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|session| session.kind)
            .collect();
        assert_eq!(kinds, vec![TimerMode::Work, TimerMode::Break]);
    }

    #[tokio::test]
    async fn test_flush_without_records_returns() {
        let (engine, _ticker, recorder) = slow_engine(Duration::from_millis(50));
        engine.flush_records().await;
        engine.reset();
        engine.flush_records().await;
        assert!(recorder.sessions.lock().unwrap().is_empty());
    }
}
