//! Ping cycle and counters

use std::future::Future;
use std::time::Duration;

use shared::{process_info, process_warn, ComponentId, HealthStatus, SharedError, StatusClient};

/// Minutes between cycles when no interval is given
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;

/// Check `/health` on every Nth cycle
pub const DEFAULT_HEALTH_EVERY: u64 = 6;

/// Keep-alive counters, for this pinger process only
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

impl PingStats {
    fn record(&mut self, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Percentage of successful attempts, 0 before the first attempt
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.successes as f64 / self.attempts as f64 * 100.0
    }
}

pub struct Pinger {
    client: StatusClient,
    health_every: u64,
    stats: PingStats,
}

impl Pinger {
    /// `health_every` of 0 is treated as 1
    pub fn new(client: StatusClient, health_every: u64) -> Self {
        Self {
            client,
            health_every: health_every.max(1),
            stats: PingStats::default(),
        }
    }

    pub fn stats(&self) -> PingStats {
        self.stats
    }

    pub fn target(&self) -> &str {
        self.client.base_url().as_str()
    }

    /// Send one keep-alive and count the outcome
    pub async fn ping(&mut self) -> bool {
        let success = match self.client.keep_alive().await {
            Ok(response) => {
                process_info!(
                    ComponentId::current(),
                    "✅ Bot is alive! Ping #{}, Uptime: {}",
                    response.ping_count,
                    response.uptime
                );
                true
            }
            Err(e) => {
                log_request_failure("Keep-alive", &e);
                false
            }
        };

        self.stats.record(success);
        success
    }

    /// Check `/health`; true only when every worker is running
    pub async fn check_health(&self) -> bool {
        let report = match self.client.health().await {
            Ok(report) => report,
            Err(e) => {
                log_request_failure("Health check", &e);
                return false;
            }
        };

        process_info!(ComponentId::current(), "🏥 Health Check: {}", report.status);
        for (worker, running) in report.worker_flags() {
            process_info!(
                ComponentId::current(),
                "   {}: {}",
                worker,
                if running { "✅ Running" } else { "❌ Down" }
            );
        }
        process_info!(ComponentId::current(), "   Uptime: {}", report.uptime_formatted);
        process_info!(ComponentId::current(), "   Restarts: {}", report.restart_count);

        report.status == HealthStatus::Healthy
    }

    /// Single check: health first, then keep-alive; both must pass
    pub async fn run_once(&mut self) -> bool {
        process_info!(ComponentId::current(), "🧪 Running single test against {}", self.target());

        let healthy = self.check_health().await;
        let alive = self.ping().await;

        if healthy && alive {
            process_info!(ComponentId::current(), "✅ Bot is healthy and responsive!");
            true
        } else {
            process_warn!(ComponentId::current(), "❌ Bot has issues");
            false
        }
    }

    /// One continuous-mode cycle: keep-alive, plus health every Nth cycle
    pub async fn cycle(&mut self) {
        let number = self.stats.attempts + 1;
        process_info!(ComponentId::current(), "🔢 Ping #{}", number);

        self.ping().await;

        if number % self.health_every == 0 {
            self.check_health().await;
            process_info!(
                ComponentId::current(),
                "📊 Success rate: {:.1}% ({}/{})",
                self.stats.success_rate(),
                self.stats.successes,
                self.stats.attempts
            );
        }
    }

    /// Cycle every `interval` until `shutdown` resolves, then return the counters
    pub async fn run_continuous<F>(&mut self, interval: Duration, shutdown: F) -> PingStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        process_info!(
            ComponentId::current(),
            "🔄 Pinging {} every {}s, press Ctrl+C to stop",
            self.target(),
            interval.as_secs_f32()
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.cycle() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        process_info!(
            ComponentId::current(),
            "📊 Final stats: {:.1}% success rate ({}/{}), {} failed",
            self.stats.success_rate(),
            self.stats.successes,
            self.stats.attempts,
            self.stats.failures
        );
        self.stats
    }
}

fn log_request_failure(what: &str, error: &SharedError) {
    match error {
        SharedError::Timeout { .. } => {
            process_warn!(ComponentId::current(), "❌ {} timed out - bot might be starting up", what);
        }
        SharedError::Network { .. } => {
            process_warn!(ComponentId::current(), "❌ {}: could not connect - check URL ({})", what, error);
        }
        SharedError::UnexpectedStatus { status, .. } => {
            process_warn!(ComponentId::current(), "⚠️ {} returned status {}", what, status);
        }
        _ => {
            process_warn!(ComponentId::current(), "❌ {} error: {}", what, error);
        }
    }
}
