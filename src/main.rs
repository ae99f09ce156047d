use std::sync::Arc;

use anyhow::{Context, Result};
use telemetry::{Clock, HttpRequest, SystemClock};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vehicle_emulator::{AppState, Config, ReqwestProvider, http, logging};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::load();

    let client: Arc<dyn HttpRequest> = Arc::new(ReqwestProvider::new(config.delivery.send_timeout)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone));
    let state = AppState::new(&config, client, clock);

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(state.sweeper(&config).run(shutdown.clone()));

    let backend = state.store().check_backend().await;
    info!(backend_url = %config.delivery.backend_url, status = ?backend, "collector health");

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("binding {}", config.bind_addr()))?;
    info!(addr = %config.bind_addr(), "listening");

    axum::serve(listener, http::router(state.clone()))
        .with_graceful_shutdown(ctrl_c(shutdown.clone()))
        .await
        .context("serving HTTP")?;

    shutdown.cancel();
    state.emulator.shutdown().await;
    if let Err(e) = sweeper.await {
        error!(error = %e, "retry sweeper failed");
    }

    match tokio::time::timeout(config.shutdown_sweep_timeout, state.store().sweep_all()).await {
        Ok(report) => info!(
            delivered = report.delivered.len(),
            remaining = state.store().pending_counts().total(),
            "final sweep complete"
        ),
        Err(_) => warn!(
            remaining = state.store().pending_counts().total(),
            "final sweep timed out, pending logs dropped"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

async fn ctrl_c(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "listening for ctrl-c failed");
            }
            info!("shutdown requested");
        }
        () = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
