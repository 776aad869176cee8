//! Session recording collaborator

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::info;

use crate::{error::RecorderError, state::store::lock, state::SessionRecord};

/// Persists finished and partial sessions.
///
/// The engine hands records over fire-and-forget on the blocking pool; a
/// failure is logged and never retried, and never affects the timer state.
pub trait SessionRecorder: Send + Sync {
    fn record(&self, session: &SessionRecord) -> Result<(), RecorderError>;
}

/// Appends one JSON object per line to a file
pub struct JsonlSessionRecorder {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSessionRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionRecorder for JsonlSessionRecorder {
    fn record(&self, session: &SessionRecord) -> Result<(), RecorderError> {
        let mut line = serde_json::to_string(session)?;
        line.push('\n');

        let _guard = lock(&self.write_lock);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        info!(
            kind = session.kind.label(),
            minutes = session.duration_minutes,
            completed = session.completed,
            "Session recorded to {}",
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps sessions in memory so tests can inspect what was recorded
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryRecorder {
    sessions: Mutex<Vec<SessionRecord>>,
}

#[cfg(test)]
impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        lock(&self.sessions).clone()
    }
}

#[cfg(test)]
impl SessionRecorder for MemoryRecorder {
    fn record(&self, session: &SessionRecord) -> Result<(), RecorderError> {
        lock(&self.sessions).push(session.clone());
        Ok(())
    }
}
