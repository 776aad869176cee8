//! Session records handed to the recorder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimerMode;

/// One finished or interrupted countdown, as reported to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub kind: TimerMode,
    pub duration_minutes: u32,
    pub completed: bool,
    pub date: DateTime<Utc>,
}

impl SessionRecord {
    /// A countdown that ran all the way to zero
    pub fn completed(kind: TimerMode, total_seconds: u64, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            duration_minutes: whole_minutes(total_seconds),
            completed: true,
            date,
        }
    }

    /// A countdown stopped early; credit is rounded up to the next minute
    pub fn partial(kind: TimerMode, elapsed_seconds: u64, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            duration_minutes: whole_minutes(elapsed_seconds),
            completed: false,
            date,
        }
    }
}

fn whole_minutes(seconds: u64) -> u32 {
    u32::try_from(seconds.div_ceil(60)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_round_up() {
        let now = Utc::now();
        assert_eq!(SessionRecord::partial(TimerMode::Work, 1, now).duration_minutes, 1);
        assert_eq!(SessionRecord::partial(TimerMode::Work, 60, now).duration_minutes, 1);
        assert_eq!(SessionRecord::partial(TimerMode::Work, 61, now).duration_minutes, 2);
        assert_eq!(SessionRecord::completed(TimerMode::Break, 300, now).duration_minutes, 5);
    }
}
