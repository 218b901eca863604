//! JSON bodies exchanged over the keeper's HTTP status surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{running_key, HealthStatus};

/// Body of `GET /health`
///
/// Worker flags are flattened into the top-level object as `<worker>_running`
/// keys, so the set of keys depends on which workers the keeper supervises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    #[serde(flatten)]
    pub workers: BTreeMap<String, bool>,
    pub restart_count: u64,
    pub last_ping: DateTime<Utc>,
    pub ping_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Last-polled running flag for a worker, `None` if the worker is not tracked
    pub fn worker_running(&self, worker: &str) -> Option<bool> {
        self.workers.get(&running_key(worker)).copied()
    }

    /// Iterate `(worker name, running)` pairs
    pub fn worker_flags(&self) -> impl Iterator<Item = (&str, bool)> {
        self.workers
            .iter()
            .map(|(key, running)| (key.strip_suffix("_running").unwrap_or(key), *running))
    }

    pub fn all_running(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Body of `GET /keep-alive`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepAliveResponse {
    pub status: String,
    pub message: String,
    pub ping_count: u64,
    pub timestamp: DateTime<Utc>,
    pub uptime: String,
}

/// Body of `POST /restart-workers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartResponse {
    pub status: String,
    pub message: String,
    pub restart_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> HealthReport {
        let mut workers = BTreeMap::new();
        workers.insert(running_key("teacher_bot"), true);
        workers.insert(running_key("student_bot"), false);

        HealthReport {
            status: HealthStatus::Partial,
            uptime_seconds: 65,
            uptime_formatted: "0:01:05".to_string(),
            workers,
            restart_count: 2,
            last_ping: Utc::now(),
            ping_count: 7,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_health_report_flattens_worker_flags() {
        let value = serde_json::to_value(sample_report()).unwrap();

        assert_eq!(value["status"], json!("partial"));
        assert_eq!(value["teacher_bot_running"], json!(true));
        assert_eq!(value["student_bot_running"], json!(false));
        assert_eq!(value["restart_count"], json!(2));
        assert!(value.get("workers").is_none());
    }

    #[test]
    fn test_health_report_worker_lookup() {
        let report = sample_report();

        assert_eq!(report.worker_running("teacher_bot"), Some(true));
        assert_eq!(report.worker_running("student_bot"), Some(false));
        assert_eq!(report.worker_running("unknown"), None);

        let flags: Vec<_> = report.worker_flags().collect();
        assert_eq!(flags, vec![("student_bot", false), ("teacher_bot", true)]);
        assert!(!report.all_running());
    }

    #[test]
    fn test_health_report_parses_server_body() {
        let body = json!({
            "status": "healthy",
            "uptime_seconds": 10,
            "uptime_formatted": "0:00:10",
            "teacher_bot_running": true,
            "student_bot_running": true,
            "restart_count": 0,
            "last_ping": "2026-01-01T00:00:00Z",
            "ping_count": 0,
            "timestamp": "2026-01-01T00:00:10Z"
        });

        let report: HealthReport = serde_json::from_value(body).unwrap();
        assert!(report.all_running());
        assert_eq!(report.workers.len(), 2);
        assert_eq!(report.worker_running("student_bot"), Some(true));
    }
}
