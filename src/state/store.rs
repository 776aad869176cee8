//! The single timer state instance and its change broadcaster

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tracing::trace;

use super::TimerState;

/// Callback invoked with a fresh snapshot after every mutation.
///
/// Listeners run while the store is locked, so they must hand the snapshot
/// off (store it, send it on a channel) instead of calling back into the store.
pub type Listener = Arc<dyn Fn(&TimerState) + Send + Sync>;

type ListenerMap = Mutex<HashMap<u64, Listener>>;

/// Owner of the canonical [`TimerState`].
///
/// Created once at process start and never torn down; all mutation goes
/// through [`TimerStore::apply`], which notifies every subscriber before the
/// lock is released.
pub struct TimerStore {
    state: Mutex<TimerState>,
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
}

impl TimerStore {
    pub fn new(initial: TimerState) -> Self {
        Self {
            state: Mutex::new(initial),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Copy of the current state
    pub fn get(&self) -> TimerState {
        lock(&self.state).clone()
    }

    /// Apply a change and broadcast the result.
    ///
    /// The change and the fan-out happen under one lock, so no observer sees
    /// a half-applied update and all observers see updates in the same order.
    pub fn apply<F, R>(&self, change: F) -> R
    where
        F: FnOnce(&mut TimerState) -> R,
    {
        let mut state = lock(&self.state);
        let result = change(&mut state);
        let snapshot = state.clone();
        self.broadcast(&snapshot);
        result
    }

    /// Register a listener for future changes
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        let _state = lock(&self.state);
        self.register(Arc::new(listener))
    }

    /// Register a listener and hand it the current state right away.
    ///
    /// Both happen under the state lock, so the listener's first delivery is
    /// never newer than anything it receives afterwards.
    pub fn attach<F>(&self, listener: F) -> (TimerState, Subscription)
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        let state = lock(&self.state);
        let current = state.clone();
        listener(&current);
        let subscription = self.register(Arc::new(listener));
        drop(state);
        (current, subscription)
    }

    /// Number of attached listeners
    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn register(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).insert(id, listener);
        trace!(id, "listener attached");
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    fn broadcast(&self, snapshot: &TimerState) {
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

/// Handle for an attached listener; dropping it detaches the listener
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl Subscription {
    /// Detach explicitly; equivalent to dropping the handle
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).remove(&self.id);
            trace!(id = self.id, "listener detached");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every writer leaves the guarded value consistent before it can panic
/// (listeners run after the change is complete), so the data stays usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
