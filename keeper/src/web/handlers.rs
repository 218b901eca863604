//! HTTP handlers for the status surface

use axum::{extract::State, response::Json};
use tokio::sync::mpsc::error::TrySendError;

use shared::{format_uptime, process_debug, process_info, process_warn, ComponentId, HealthReport, KeepAliveResponse, RestartResponse};

use crate::core::RestartRequest;
use crate::web::AppState;

pub const HOME_MESSAGE: &str = "🤖 Telegram Quiz Bot is running 24/7! 🎓";

pub const KEEP_ALIVE_MESSAGE: &str = "Bot is running 24/7";

/// `GET /`
pub async fn home() -> &'static str {
    HOME_MESSAGE
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.report().await)
}

/// `GET /keep-alive` - counts as a ping
pub async fn keep_alive(State(state): State<AppState>) -> Json<KeepAliveResponse> {
    let record = state.health.record_ping().await;
    process_debug!(ComponentId::current(), "🏓 Keep-alive ping #{}", record.ping_count);

    Json(KeepAliveResponse {
        status: "alive".to_string(),
        message: KEEP_ALIVE_MESSAGE.to_string(),
        ping_count: record.ping_count,
        timestamp: record.timestamp,
        uptime: format_uptime(record.uptime),
    })
}

/// `GET /ping`
pub async fn ping() -> &'static str {
    "pong"
}

/// `POST /restart-workers` - queue a restart of every worker
///
/// Only one request can be pending; further requests while one is queued
/// are answered with `busy`.
pub async fn restart_workers(State(state): State<AppState>) -> Json<RestartResponse> {
    let (status, message) = match state.restart_tx.try_send(RestartRequest) {
        Ok(()) => {
            process_info!(ComponentId::current(), "🔄 Worker restart requested over HTTP");
            ("accepted", "Restart of all workers queued")
        }
        Err(TrySendError::Full(_)) => ("busy", "A restart is already pending"),
        Err(TrySendError::Closed(_)) => {
            process_warn!(ComponentId::current(), "⚠️ Restart requested but the supervisor is not running");
            ("busy", "Supervisor is not accepting restarts")
        }
    };

    Json(RestartResponse {
        status: status.to_string(),
        message: message.to_string(),
        restart_count: state.health.restart_count().await,
    })
}
