//! Process-wide health state
//!
//! Written by the supervisor (worker statuses, restart count) and by the
//! keep-alive handler (ping count, last ping), read by the status handlers.
//! Every mutation happens under one write lock, so concurrent pings and
//! supervisor updates never lose increments.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shared::{format_uptime, running_key, HealthReport, HealthStatus};

/// Counters and statuses behind the lock
#[derive(Debug, Clone)]
struct HealthInner {
    last_ping_time: DateTime<Utc>,
    ping_count: u64,
    restart_count: u64,
    worker_statuses: BTreeMap<String, bool>,
}

/// Result of recording one keep-alive ping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRecord {
    pub ping_count: u64,
    pub timestamp: DateTime<Utc>,
    pub uptime: Duration,
}

/// Shared health state, one per process
#[derive(Debug)]
pub struct HealthState {
    start_time: DateTime<Utc>,
    started: Instant,
    inner: RwLock<HealthInner>,
}

impl HealthState {
    /// Create state tracking the given workers, all initially not running
    pub fn new<I, S>(workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start_time = Utc::now();
        let worker_statuses = workers.into_iter().map(|name| (name.into(), false)).collect();

        Self {
            start_time,
            started: Instant::now(),
            inner: RwLock::new(HealthInner {
                last_ping_time: start_time,
                ping_count: 0,
                restart_count: 0,
                worker_statuses,
            }),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record a keep-alive ping
    ///
    /// The stored ping time strictly increases: if the wall clock has not moved
    /// past the previous ping (or went backwards), it is advanced by 1µs.
    pub async fn record_ping(&self) -> PingRecord {
        let mut inner = self.inner.write().await;

        let now = Utc::now();
        let timestamp = if now > inner.last_ping_time {
            now
        } else {
            inner.last_ping_time + chrono::Duration::microseconds(1)
        };

        inner.last_ping_time = timestamp;
        inner.ping_count += 1;

        PingRecord {
            ping_count: inner.ping_count,
            timestamp,
            uptime: self.uptime(),
        }
    }

    /// Count one relaunch attempt, returning the new total
    pub async fn record_restart(&self) -> u64 {
        let mut inner = self.inner.write().await;
        inner.restart_count += 1;
        inner.restart_count
    }

    /// Store the last-polled status of a worker
    pub async fn set_worker_status(&self, worker: &str, running: bool) {
        let mut inner = self.inner.write().await;
        inner.worker_statuses.insert(worker.to_string(), running);
    }

    /// Store several statuses under one lock acquisition
    pub async fn set_worker_statuses<'a, I>(&self, statuses: I)
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut inner = self.inner.write().await;
        for (worker, running) in statuses {
            inner.worker_statuses.insert(worker.to_string(), running);
        }
    }

    pub async fn worker_status(&self, worker: &str) -> Option<bool> {
        self.inner.read().await.worker_statuses.get(worker).copied()
    }

    pub async fn ping_count(&self) -> u64 {
        self.inner.read().await.ping_count
    }

    pub async fn restart_count(&self) -> u64 {
        self.inner.read().await.restart_count
    }

    pub async fn status(&self) -> HealthStatus {
        let inner = self.inner.read().await;
        HealthStatus::from_workers(inner.worker_statuses.values().copied())
    }

    /// Consistent snapshot for `/health`
    pub async fn report(&self) -> HealthReport {
        let inner = self.inner.read().await;
        let uptime = self.uptime();

        HealthReport {
            status: HealthStatus::from_workers(inner.worker_statuses.values().copied()),
            uptime_seconds: uptime.as_secs(),
            uptime_formatted: format_uptime(uptime),
            workers: inner
                .worker_statuses
                .iter()
                .map(|(name, running)| (running_key(name), *running))
                .collect(),
            restart_count: inner.restart_count,
            last_ping: inner.last_ping_time,
            ping_count: inner.ping_count,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_initial_state() {
        let state = HealthState::new(["teacher_bot", "student_bot"]);
        let report = state.report().await;

        assert_eq!(report.ping_count, 0);
        assert_eq!(report.restart_count, 0);
        assert_eq!(report.last_ping, state.start_time());
        assert_eq!(report.worker_running("teacher_bot"), Some(false));
        assert_eq!(report.worker_running("student_bot"), Some(false));
        assert_eq!(report.status, HealthStatus::Partial);
    }

    #[tokio::test]
    async fn test_status_follows_worker_flags() {
        let state = HealthState::new(["a", "b"]);

        state.set_worker_statuses([("a", true), ("b", true)]).await;
        assert_eq!(state.status().await, HealthStatus::Healthy);

        state.set_worker_status("b", false).await;
        assert_eq!(state.status().await, HealthStatus::Partial);
        assert_eq!(state.worker_status("b").await, Some(false));
        assert_eq!(state.worker_status("missing").await, None);
    }

    #[tokio::test]
    async fn test_ping_times_strictly_increase() {
        let state = HealthState::new(Vec::<String>::new());
        let mut previous = state.start_time();

        for expected in 1..=6 {
            let record = state.record_ping().await;
            assert_eq!(record.ping_count, expected);
            assert!(record.timestamp > previous);
            previous = record.timestamp;
        }

        assert_eq!(state.report().await.last_ping, previous);
    }

    #[tokio::test]
    async fn test_concurrent_pings_and_restarts_are_not_lost() {
        let state = Arc::new(HealthState::new(["bot"]));
        let mut tasks = Vec::new();

        for _ in 0..50 {
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                state.record_ping().await;
                state.record_restart().await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(state.ping_count().await, 50);
        assert_eq!(state.restart_count().await, 50);
    }
}
