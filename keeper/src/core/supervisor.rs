//! Worker supervisor
//!
//! Each worker moves through `Stopped → Starting → Running → Dead → Starting …`.
//! A full liveness sweep runs every poll interval. A death found by a sweep
//! triggers an immediate relaunch; a failed launch leaves the worker `Dead`
//! and schedules the next attempt one cooldown later, so a worker that keeps
//! crashing on startup is retried on a fixed cadence instead of in a tight loop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use shared::{logging, process_debug, process_error, process_info, process_warn, ComponentId};

use crate::config::{KeeperConfig, WorkerSpec};
use crate::core::state::HealthState;
use crate::error::KeeperResult;
use crate::traits::{WorkerHandle, WorkerLauncher};

/// Lifecycle state of one supervised worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Starting,
    Running,
    Dead,
}

/// Request to stop and relaunch every worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartRequest;

/// Timing of the supervisor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub restart_cooldown: Duration,
}

impl From<&KeeperConfig> for SupervisorConfig {
    fn from(config: &KeeperConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            restart_cooldown: config.restart_cooldown,
        }
    }
}

struct WorkerSlot {
    spec: WorkerSpec,
    state: WorkerState,
    handle: Option<Box<dyn WorkerHandle>>,
    retry_at: Option<Instant>,
    consecutive_failures: u32,
}

impl WorkerSlot {
    fn new(spec: WorkerSpec) -> Self {
        Self {
            spec,
            state: WorkerState::Stopped,
            handle: None,
            retry_at: None,
            consecutive_failures: 0,
        }
    }

    fn is_running(&self) -> bool {
        self.state == WorkerState::Running
    }

    /// Move out of `Starting` according to the launch outcome
    fn settle(&mut self, result: KeeperResult<Box<dyn WorkerHandle>>, cooldown: Duration) {
        match result {
            Ok(handle) => {
                process_info!(
                    ComponentId::current(),
                    worker = %self.spec.name,
                    "✅ {} started successfully (PID: {})",
                    self.spec.name,
                    handle.pid().map(|p| p.to_string()).unwrap_or_else(|| "n/a".to_string())
                );
                self.handle = Some(handle);
                self.state = WorkerState::Running;
                self.retry_at = None;
                self.consecutive_failures = 0;
            }
            Err(e) => {
                self.handle = None;
                self.state = WorkerState::Dead;
                self.consecutive_failures += 1;
                self.retry_at = Some(Instant::now() + cooldown);
                process_error!(
                    ComponentId::current(),
                    worker = %self.spec.name,
                    "❌ {} (attempt {} in a row), retrying in {}s",
                    e,
                    self.consecutive_failures,
                    cooldown.as_secs_f32()
                );
            }
        }
    }
}

/// Polls worker handles and relaunches dead workers
pub struct Supervisor<L>
where
    L: WorkerLauncher + 'static,
{
    launcher: L,
    health: Arc<HealthState>,
    slots: Vec<WorkerSlot>,
    config: SupervisorConfig,
}

impl<L> Supervisor<L>
where
    L: WorkerLauncher + 'static,
{
    pub fn new(launcher: L, workers: Vec<WorkerSpec>, health: Arc<HealthState>, config: SupervisorConfig) -> Self {
        Self {
            launcher,
            health,
            slots: workers.into_iter().map(WorkerSlot::new).collect(),
            config,
        }
    }

    pub fn worker_state(&self, worker: &str) -> Option<WorkerState> {
        self.slots.iter().find(|s| s.spec.name == worker).map(|s| s.state)
    }

    /// Initial launch of every stopped worker, concurrently
    pub async fn start_all(&mut self) {
        let cooldown = self.config.restart_cooldown;
        let launcher = &self.launcher;

        let mut pending: Vec<&mut WorkerSlot> = self
            .slots
            .iter_mut()
            .filter(|slot| slot.state == WorkerState::Stopped)
            .collect();
        for slot in pending.iter_mut() {
            slot.state = WorkerState::Starting;
        }

        let results = join_all(pending.iter().map(|slot| {
            process_info!(ComponentId::current(), worker = %slot.spec.name, "🚀 Starting {}...", slot.spec.name);
            launcher.launch(&slot.spec)
        }))
        .await;

        for (slot, result) in pending.into_iter().zip(results) {
            slot.settle(result, cooldown);
        }

        self.publish_statuses().await;

        let running = self.slots.iter().filter(|s| s.is_running()).count();
        if running == self.slots.len() {
            logging::log_success(ComponentId::current(), &format!("All {running} workers started"));
        } else {
            process_warn!(
                ComponentId::current(),
                "⚠️ {}/{} workers started, failed ones retry in {}s",
                running,
                self.slots.len(),
                self.config.restart_cooldown.as_secs_f32()
            );
        }
    }

    /// Full sweep: poll every running worker and retry every dead worker whose cooldown elapsed
    pub async fn sweep(&mut self) {
        self.visit(true).await;

        if !self.slots.is_empty() && self.slots.iter().all(WorkerSlot::is_running) {
            process_info!(
                ComponentId::current(),
                "✅ All {} workers healthy (uptime: {})",
                self.slots.len(),
                shared::format_uptime(self.health.uptime())
            );
        }
    }

    /// Retry dead workers whose cooldown elapsed, without polling the others
    async fn retry_due(&mut self) {
        self.visit(false).await;
    }

    async fn visit(&mut self, poll_running: bool) {
        let cooldown = self.config.restart_cooldown;
        let launcher = &self.launcher;
        let health = &self.health;
        let now = Instant::now();

        for slot in self.slots.iter_mut() {
            let relaunch = match slot.state {
                WorkerState::Running if poll_running => {
                    let alive = match slot.handle.as_mut() {
                        Some(handle) => handle.is_alive(),
                        None => Ok(false),
                    };
                    match alive {
                        Ok(true) => false,
                        Ok(false) => {
                            process_warn!(
                                ComponentId::current(),
                                worker = %slot.spec.name,
                                "💀 {} died",
                                slot.spec.name
                            );
                            slot.handle = None;
                            slot.state = WorkerState::Dead;
                            health.set_worker_status(&slot.spec.name, false).await;
                            true
                        }
                        Err(e) => {
                            // Unknown: keep the last known state, try again next sweep
                            process_warn!(ComponentId::current(), worker = %slot.spec.name, "⚠️ {}", e);
                            false
                        }
                    }
                }
                WorkerState::Dead => slot.retry_at.map_or(true, |at| now >= at),
                _ => false,
            };

            if relaunch {
                let count = health.record_restart().await;
                process_info!(
                    ComponentId::current(),
                    worker = %slot.spec.name,
                    "🔄 Restarting {} (restart #{})",
                    slot.spec.name,
                    count
                );
                slot.state = WorkerState::Starting;
                let result = launcher.launch(&slot.spec).await;
                slot.settle(result, cooldown);
            }
        }

        self.publish_statuses().await;
    }

    /// Stop and relaunch every worker; each relaunch counts as one restart
    pub async fn restart_all(&mut self) {
        process_info!(ComponentId::current(), "🔄 Restarting all {} workers on request", self.slots.len());

        let cooldown = self.config.restart_cooldown;
        let launcher = &self.launcher;
        let health = &self.health;

        for slot in self.slots.iter_mut() {
            if let Some(mut handle) = slot.handle.take() {
                handle.stop().await;
            }
            slot.state = WorkerState::Starting;
            health.set_worker_status(&slot.spec.name, false).await;

            let count = health.record_restart().await;
            process_debug!(ComponentId::current(), worker = %slot.spec.name, "restart #{}", count);

            let result = launcher.launch(&slot.spec).await;
            slot.settle(result, cooldown);
        }

        self.publish_statuses().await;
    }

    /// Request termination of every worker (fire-and-forget)
    pub async fn stop_all(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(mut handle) = slot.handle.take() {
                process_debug!(ComponentId::current(), worker = %slot.spec.name, "🛑 Stopping {}", slot.spec.name);
                handle.stop().await;
            }
            slot.state = WorkerState::Stopped;
            slot.retry_at = None;
        }

        self.publish_statuses().await;
        process_info!(ComponentId::current(), "🛑 All workers stopped");
    }

    async fn publish_statuses(&self) {
        self.health
            .set_worker_statuses(self.slots.iter().map(|s| (s.spec.name.as_str(), s.is_running())))
            .await;
    }

    /// Earliest of the next full sweep and the earliest pending retry
    fn next_wakeup(&self, next_poll: Instant) -> Instant {
        self.slots
            .iter()
            .filter(|s| s.state == WorkerState::Dead)
            .filter_map(|s| s.retry_at)
            .min()
            .map_or(next_poll, |retry| retry.min(next_poll))
    }

    /// Run the poll loop until shutdown, then stop every worker
    ///
    /// Call [`Supervisor::start_all`] first; workers still `Stopped` are not
    /// launched by the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>, mut restarts: mpsc::Receiver<RestartRequest>) {
        process_debug!(
            ComponentId::current(),
            "👀 Supervisor polling every {}s (cooldown {}s)",
            self.config.poll_interval.as_secs_f32(),
            self.config.restart_cooldown.as_secs_f32()
        );

        let mut next_poll = Instant::now() + self.config.poll_interval;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wake_at = self.next_wakeup(next_poll);

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can ask for shutdown any more, treat as shutdown
                        break;
                    }
                }

                Some(RestartRequest) = restarts.recv() => {
                    self.restart_all().await;
                }

                _ = tokio::time::sleep_until(wake_at) => {
                    if Instant::now() >= next_poll {
                        self.sweep().await;
                        next_poll = Instant::now() + self.config.poll_interval;
                    } else {
                        self.retry_due().await;
                    }
                }
            }
        }

        self.stop_all().await;
    }
}
