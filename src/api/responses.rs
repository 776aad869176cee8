//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{TimerMode, TimerState};

/// Timer state plus the derived values a display needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerStatusResponse {
    pub state: TimerState,
    pub formatted_time: String,
    pub progress_percentage: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&TimerState> for TimerStatusResponse {
    fn from(state: &TimerState) -> Self {
        Self {
            formatted_time: state.formatted_time(),
            progress_percentage: state.progress_percentage(),
            state: state.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /timer/mode`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchModeRequest {
    pub mode: TimerMode,
}

/// Body of `PUT /timer/settings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub work_minutes: u32,
    pub break_minutes: u32,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub subscribers: usize,
}

impl HealthResponse {
    pub fn ok(uptime: String, subscribers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            subscribers,
        }
    }
}
