//! HTTP API for the workload, health checks and Prometheus metrics

use crate::metrics::{ServerMetrics, EXPOSITION_CONTENT_TYPE};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: ServerMetrics,
    pub burn: Duration,
}

impl AppState {
    pub fn new(metrics: ServerMetrics, burn: Duration) -> Self {
        Self { metrics, burn }
    }
}

/// Spin on arithmetic until `duration` of wall time has passed
pub fn burn_cpu(duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut acc: u64 = 0;
    while Instant::now() < deadline {
        for i in 0..1_000u64 {
            acc = std::hint::black_box(acc.wrapping_add(i.wrapping_mul(i)));
        }
    }
    std::hint::black_box(acc);
}

/// Workload endpoint: count the request, then burn CPU off the async runtime
async fn work(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.inc_requests();

    let burn = state.burn;
    match tokio::task::spawn_blocking(move || burn_cpu(burn)).await {
        Ok(()) => (StatusCode::OK, "OK\n"),
        Err(e) => {
            warn!(error = %e, "Burn task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "burn failed\n")
        }
    }
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok\n"
}

/// Create the API router
///
/// Any GET path other than `/metrics` and `/healthz` is served as workload.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(work))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .fallback(get(work))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting workload server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_cpu_runs_for_duration() {
        let started = Instant::now();
        burn_cpu(Duration::from_millis(20));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_zero_burn_returns_immediately() {
        let started = Instant::now();
        burn_cpu(Duration::ZERO);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
