//! CPU burn server
//!
//! Runs inside the autoscaled Deployment. Each request burns a fixed CPU slice so that
//! load translates into utilization the HPA can react to.

use anyhow::{Context, Result};
use cpu_burn_server::{api, AppState, ServerConfig, ServerMetrics};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        version = SERVER_VERSION,
        port = config.port,
        burn_ms = config.burn_ms,
        "Starting cpu-burn-server"
    );

    let metrics = ServerMetrics::new().context("Failed to register request counter")?;
    let state = Arc::new(AppState::new(metrics, config.burn_duration()));

    api::serve(&config.listen_addr(), state, shutdown_signal()).await
}
