//! Focus Timer - serves the shared focus/break countdown over HTTP
//!
//! This is the main entry point for the focus-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use focus_timer::{
    api::create_router,
    config::Config,
    engine::TimerEngine,
    services::{JsonlSessionRecorder, LogNotifier},
    state::AppState,
    tasks::IntervalTicker,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, work={}min, break={}min",
        config.host, config.port, config.work_minutes, config.break_minutes
    );

    let recorder = Arc::new(JsonlSessionRecorder::new(&config.sessions_file));
    info!("Recording sessions to {}", recorder.path().display());

    // One engine for the whole process; every view attaches to it
    let engine = TimerEngine::new(
        config.durations(),
        Arc::new(IntervalTicker::new()),
        recorder,
        Arc::new(LogNotifier),
    );

    let state = Arc::new(AppState::new(
        engine.clone(),
        config.auto_switch(),
        config.port,
        config.host.clone(),
    ));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer          - Current timer status");
    info!("  POST /timer/start    - Start or resume the countdown");
    info!("  POST /timer/pause    - Pause and record partial progress");
    info!("  POST /timer/reset    - Reload the countdown for the current mode");
    info!("  POST /timer/mode     - Switch between work and break");
    info!("  PUT  /timer/settings - Change work/break minutes");
    info!("  GET  /timer/events   - Server-sent stream of state changes");
    info!("  GET  /health         - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal(engine) => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
