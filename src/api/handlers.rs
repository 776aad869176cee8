//! HTTP endpoint handlers
//!
//! Every request works through its own [`TimerView`](crate::engine::TimerView),
//! attached for the duration of the request (or of the event stream).

use std::sync::Arc;
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::state::AppState;
use super::responses::{
    HealthResponse, SwitchModeRequest, TimerStatusResponse, UpdateSettingsRequest,
};

/// Handle GET /timer - Current timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<TimerStatusResponse> {
    let view = state.view();
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle POST /timer/start - Start or resume the countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Json<TimerStatusResponse> {
    let view = state.view();
    state.start_timer(&view);
    info!("Start endpoint called");
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle POST /timer/pause - Pause and bank partial progress
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<TimerStatusResponse> {
    let view = state.view();
    view.pause();
    info!("Pause endpoint called");
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle POST /timer/reset - Reload the countdown for the current mode
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<TimerStatusResponse> {
    let view = state.view();
    view.reset();
    info!("Reset endpoint called");
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle POST /timer/mode - Switch between work and break
pub async fn mode_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SwitchModeRequest>,
) -> Json<TimerStatusResponse> {
    let view = state.view();
    view.switch_mode(request.mode);
    info!("Mode endpoint called - mode={}", request.mode.label());
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle PUT /timer/settings - Change work/break durations
pub async fn settings_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Json<TimerStatusResponse> {
    let view = state.view();
    view.update_settings(request.work_minutes, request.break_minutes);
    info!(
        "Settings endpoint called - work={}min, break={}min",
        request.work_minutes, request.break_minutes
    );
    Json(TimerStatusResponse::from(&view.snapshot()))
}

/// Handle GET /timer/events - Stream every state change as server-sent events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let view = state.view();
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = view.subscribe(move |snapshot| {
        let _ = tx.send(snapshot.clone());
    });
    debug!("Event stream attached");

    // The view and its subscription live as long as the stream; the client
    // disconnecting drops both and detaches from the engine.
    let events = stream::unfold(
        (rx, view, subscription),
        |(mut rx, view, subscription)| async move {
            let snapshot = rx.recv().await?;
            let event = Event::default()
                .event("timer")
                .json_data(TimerStatusResponse::from(&snapshot));
            Some((event, (rx, view, subscription)))
        },
    );

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.get_uptime(),
        state.engine.subscriber_count(),
    ))
}
