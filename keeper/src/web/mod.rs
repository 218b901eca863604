//! HTTP status surface
//!
//! Routes read and update the shared [`HealthState`]; manual restarts are
//! forwarded to the supervisor over a bounded channel.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::core::{HealthState, RestartRequest};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<HealthState>,
    pub restart_tx: mpsc::Sender<RestartRequest>,
}

impl AppState {
    pub fn new(health: Arc<HealthState>, restart_tx: mpsc::Sender<RestartRequest>) -> Self {
        Self { health, restart_tx }
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/keep-alive", get(handlers::keep_alive))
        .route("/ping", get(handlers::ping))
        .route("/restart-workers", post(handlers::restart_workers))
        .with_state(state);

    with_layers(routes)
}

/// Request tracing, and panics turned into 500 responses
fn with_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::new())
            .into_inner(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde::de::DeserializeOwned;
    use shared::{HealthReport, HealthStatus, KeepAliveResponse, RestartResponse};
    use tower::ServiceExt;

    fn app() -> (AppState, mpsc::Receiver<RestartRequest>) {
        let (restart_tx, restart_rx) = mpsc::channel(1);
        let health = Arc::new(HealthState::new(["teacher_bot", "student_bot"]));
        (AppState::new(health, restart_tx), restart_rx)
    }

    async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn call_json<T: DeserializeOwned>(router: &Router, method: &str, uri: &str) -> T {
        let (status, body) = call(router, method, uri).await;
        assert_eq!(status, StatusCode::OK, "{method} {uri}");
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_home_and_ping() {
        let (state, _rx) = app();
        let router = build_router(state);

        let (status, body) = call(&router, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap(), handlers::HOME_MESSAGE);

        let (status, body) = call(&router, "GET", "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
    }

    #[tokio::test]
    async fn test_keep_alive_counts_pings() {
        let (state, _rx) = app();
        let router = build_router(state);
        let mut last = None;

        for expected in 1..=6 {
            let response: KeepAliveResponse = call_json(&router, "GET", "/keep-alive").await;
            assert_eq!(response.status, "alive");
            assert_eq!(response.ping_count, expected);
            if let Some(previous) = last {
                assert!(response.timestamp > previous);
            }
            last = Some(response.timestamp);
        }

        let report: HealthReport = call_json(&router, "GET", "/health").await;
        assert_eq!(report.ping_count, 6);
        assert_eq!(Some(report.last_ping), last);
    }

    #[tokio::test]
    async fn test_health_reflects_worker_statuses() {
        let (state, _rx) = app();
        let health = state.health.clone();
        let router = build_router(state);

        let report: HealthReport = call_json(&router, "GET", "/health").await;
        assert_eq!(report.status, HealthStatus::Partial);
        assert_eq!(report.worker_running("teacher_bot"), Some(false));

        health.set_worker_statuses([("teacher_bot", true), ("student_bot", true)]).await;
        let (_, body) = call(&router, "GET", "/health").await;
        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw["status"], "healthy");
        assert_eq!(raw["teacher_bot_running"], true);
        assert_eq!(raw["student_bot_running"], true);

        health.set_worker_status("student_bot", false).await;
        let report: HealthReport = call_json(&router, "GET", "/health").await;
        assert_eq!(report.status, HealthStatus::Partial);
    }

    #[tokio::test]
    async fn test_restart_workers_queues_one_request() {
        let (state, mut rx) = app();
        let router = build_router(state);

        let first: RestartResponse = call_json(&router, "POST", "/restart-workers").await;
        assert_eq!(first.status, "accepted");

        let second: RestartResponse = call_json(&router, "POST", "/restart-workers").await;
        assert_eq!(second.status, "busy");

        assert_eq!(rx.recv().await, Some(RestartRequest));
        let third: RestartResponse = call_json(&router, "POST", "/restart-workers").await;
        assert_eq!(third.status, "accepted");
    }

    #[tokio::test]
    async fn test_restart_workers_without_supervisor() {
        let (state, rx) = app();
        drop(rx);
        let router = build_router(state);

        let response: RestartResponse = call_json(&router, "POST", "/restart-workers").await;
        assert_eq!(response.status, "busy");
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let (state, _rx) = app();
        let router = build_router(state);

        let (status, _) = call(&router, "GET", "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&router, "GET", "/restart-workers").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        async fn boom() -> &'static str {
            panic!("handler blew up")
        }
        let router = with_layers(Router::new().route("/boom", get(boom)));

        let (status, _) = call(&router, "GET", "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
