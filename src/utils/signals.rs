//! Signal handling for graceful shutdown

use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::{info, warn};

use crate::engine::TimerEngine;

/// Wait for SIGTERM or SIGINT, then pause the engine so a countdown that is
/// still running gets recorded as a partial session, and wait for the
/// recorder to catch up before the process exits.
pub async fn shutdown_signal(engine: TimerEngine) {
    match Signals::new([SIGTERM, SIGINT]) {
        Ok(mut signals) => {
            if let Some(signal) = signals.next().await {
                info!("Received signal: {}", signal);
            }
        }
        Err(e) => {
            warn!("Failed to install signal handler, falling back to ctrl-c: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                return std::future::pending().await;
            }
        }
    }

    if engine.snapshot().is_running {
        info!("Banking running session before shutdown");
    }
    engine.pause();
    engine.flush_records().await;
}
