//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(status_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/mode", post(mode_handler))
        .route("/timer/settings", put(settings_handler))
        .route("/timer/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::TimerEngine,
        services::{LogNotifier, MemoryRecorder},
        state::{Durations, TimerMode},
        tasks::IntervalTicker,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::responses::{HealthResponse, TimerStatusResponse};

    fn app_state() -> Arc<AppState> {
        let engine = TimerEngine::new(
            Durations::new(1500, 300),
            Arc::new(IntervalTicker::new()),
            Arc::new(MemoryRecorder::new()),
            Arc::new(LogNotifier),
        );
        Arc::new(AppState::new(engine, true, 0, "127.0.0.1".to_string()))
    }

    async fn call(state: &Arc<AppState>, method: Method, uri: &str, body: Option<&str>) -> TimerStatusResponse {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = create_router(Arc::clone(state))
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_status() {
        let state = app_state();
        let started = call(&state, Method::POST, "/timer/start", None).await;
        assert!(started.state.is_running);
        assert_eq!(started.formatted_time, "25:00");

        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;

        let status = call(&state, Method::GET, "/timer", None).await;
        assert_eq!(status.state.remaining_seconds, 1498);
        assert_eq!(status.formatted_time, "24:58");
    }

    #[tokio::test]
    async fn test_second_start_is_not_an_error() {
        let state = app_state();
        call(&state, Method::POST, "/timer/start", None).await;
        let again = call(&state, Method::POST, "/timer/start", None).await;
        assert!(again.state.is_running);

        let paused = call(&state, Method::POST, "/timer/pause", None).await;
        assert!(!paused.state.is_running);
    }

    #[tokio::test]
    async fn test_mode_and_settings() {
        let state = app_state();
        let switched = call(&state, Method::POST, "/timer/mode", Some(r#"{"mode":"break"}"#)).await;
        assert_eq!(switched.state.mode, TimerMode::Break);
        assert_eq!(switched.formatted_time, "05:00");

        let updated = call(
            &state,
            Method::PUT,
            "/timer/settings",
            Some(r#"{"work_minutes":50,"break_minutes":10}"#),
        )
        .await;
        assert_eq!(updated.state.remaining_seconds, 600);
        assert_eq!(updated.state.work_duration_seconds, 3000);

        let reset = call(&state, Method::POST, "/timer/reset", None).await;
        assert_eq!(reset.formatted_time, "10:00");
    }

    #[tokio::test]
    async fn test_health_reports_no_leaked_views() {
        let state = app_state();
        call(&state, Method::GET, "/timer", None).await;

        let response = create_router(Arc::clone(&state))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.subscribers, 0);
    }
}
