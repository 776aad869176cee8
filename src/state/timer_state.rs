//! Timer state structure and the rules that keep it consistent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionRecord;

/// Longest duration a user can configure for either mode
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Which kind of session the countdown currently represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Work,
    Break,
}

impl TimerMode {
    /// The mode that naturally follows this one
    pub fn toggled(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

/// Configured session lengths, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub work_seconds: u64,
    pub break_seconds: u64,
}

impl Durations {
    pub fn new(work_seconds: u64, break_seconds: u64) -> Self {
        Self {
            work_seconds: work_seconds.max(1),
            break_seconds: break_seconds.max(1),
        }
    }

    /// Build durations from user-facing minutes, clamped to `1..=MAX_DURATION_MINUTES`
    pub fn from_minutes(work_minutes: u32, break_minutes: u32) -> Self {
        Self::new(
            clamp_minutes(work_minutes) as u64 * 60,
            clamp_minutes(break_minutes) as u64 * 60,
        )
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self::from_minutes(25, 5)
    }
}

pub fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(1, MAX_DURATION_MINUTES)
}

/// The canonical countdown state.
///
/// Exactly one lives inside a [`TimerStore`](super::TimerStore); everything
/// handed out to observers is a clone of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub is_running: bool,
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub session_started_at: Option<DateTime<Utc>>,
    pub work_duration_seconds: u64,
    pub break_duration_seconds: u64,
}

impl TimerState {
    /// Fresh idle work countdown for the given durations
    pub fn new(durations: Durations) -> Self {
        Self {
            mode: TimerMode::Work,
            is_running: false,
            remaining_seconds: durations.work_seconds,
            total_seconds: durations.work_seconds,
            session_started_at: None,
            work_duration_seconds: durations.work_seconds,
            break_duration_seconds: durations.break_seconds,
        }
    }

    /// Configured duration for `mode`
    pub fn duration_for(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Work => self.work_duration_seconds,
            TimerMode::Break => self.break_duration_seconds,
        }
    }

    /// Reload the countdown from the configured duration of the current mode
    /// and forget the session start marker.
    pub fn resync(&mut self) {
        let duration = self.duration_for(self.mode);
        self.total_seconds = duration;
        self.remaining_seconds = duration;
        self.session_started_at = None;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds.saturating_sub(self.remaining_seconds)
    }

    /// Stop the countdown, returning the partial session earned so far.
    ///
    /// Nothing is returned when no time elapsed since the countdown was
    /// loaded or when no session was ever started.
    pub fn halt(&mut self, now: DateTime<Utc>) -> Option<SessionRecord> {
        self.is_running = false;
        if self.session_started_at.is_none() || self.remaining_seconds >= self.total_seconds {
            return None;
        }
        Some(SessionRecord::partial(self.mode, self.elapsed_seconds(), now))
    }

    /// Time left as `mm:ss`
    pub fn formatted_time(&self) -> String {
        format_time(self.remaining_seconds)
    }

    /// Share of the current countdown already elapsed, `0.0..=100.0`
    pub fn progress_percentage(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        self.elapsed_seconds() as f64 / self.total_seconds as f64 * 100.0
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

/// Format a second count as zero-padded `mm:ss`; minutes are not wrapped into hours
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
