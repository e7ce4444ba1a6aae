//! Integration tests for the workload server endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use cpu_burn_server::{create_router, AppState, ServerMetrics};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn setup_test_app() -> (Router, Arc<AppState>) {
    let metrics = ServerMetrics::new().unwrap();
    let state = Arc::new(AppState::new(metrics, Duration::ZERO));
    let router = create_router(state.clone());

    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_root_serves_workload_and_counts() {
    let (app, state) = setup_test_app();

    let (status, _, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK\n");
    assert_eq!(state.metrics.requests_total(), 1);
}

#[tokio::test]
async fn test_unknown_path_is_workload() {
    let (app, state) = setup_test_app();

    let (status, _, body) = get(app, "/anything/else").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK\n");
    assert_eq!(state.metrics.requests_total(), 1);
}

#[tokio::test]
async fn test_healthz_does_not_count() {
    let (app, state) = setup_test_app();

    let (status, _, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok\n");
    assert_eq!(state.metrics.requests_total(), 0);
}

#[tokio::test]
async fn test_metrics_reports_request_count() {
    let (app, state) = setup_test_app();

    for _ in 0..3 {
        let (status, _, _) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, content_type, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/plain; version=0.0.4"));
    assert!(body.contains("# HELP http_requests_total Total number of HTTP requests received."));
    assert!(body.contains("http_requests_total 3"));
    assert_eq!(state.metrics.requests_total(), 3);
}

#[tokio::test]
async fn test_metrics_scrape_is_not_counted() {
    let (app, state) = setup_test_app();

    get(app.clone(), "/metrics").await;
    let (_, _, body) = get(app, "/metrics").await;

    assert!(body.contains("http_requests_total 0"));
    assert_eq!(state.metrics.requests_total(), 0);
}
