//! Helpers to run a keeper on an ephemeral loopback port

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use keeper::{HealthState, Keeper, KeeperConfig, KeeperResult, SelfPingConfig, ShutdownHandle, WorkerLauncher, WorkerSpec};
use shared::StatusClient;

use super::fixtures::TestFixtures;

/// Builds a keeper config with fast timings and no self-ping
pub struct KeeperBuilder {
    config: KeeperConfig,
}

impl Default for KeeperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeeperBuilder {
    pub fn new() -> Self {
        Self {
            config: KeeperConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                workers: TestFixtures::workers(),
                poll_interval: Duration::from_millis(100),
                grace_window: Duration::from_millis(50),
                restart_cooldown: Duration::from_millis(300),
                self_ping: None,
                ..KeeperConfig::default()
            },
        }
    }

    pub fn with_workers(mut self, workers: Vec<WorkerSpec>) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.restart_cooldown = cooldown;
        self
    }

    pub fn with_self_ping(mut self, self_ping: SelfPingConfig) -> Self {
        self.config.self_ping = Some(self_ping);
        self
    }

    pub fn config(&self) -> KeeperConfig {
        self.config.clone()
    }

    pub fn build<L: WorkerLauncher + 'static>(self, launcher: L) -> KeeperResult<Keeper<L>> {
        Keeper::new(self.config, launcher)
    }

    /// Bind and serve in a background task
    pub async fn start<L: WorkerLauncher + 'static>(self, launcher: L) -> RunningKeeper {
        let keeper = self.build(launcher).unwrap();
        let listener = keeper.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let health = keeper.health();
        let shutdown = keeper.shutdown_handle();
        let task = tokio::spawn(keeper.serve(listener));
        let client = StatusClient::new(&format!("http://{addr}"))
            .unwrap()
            .with_timeout(Duration::from_secs(5));

        RunningKeeper {
            addr,
            client,
            health,
            shutdown,
            task,
        }
    }
}

pub struct RunningKeeper {
    pub addr: SocketAddr,
    pub client: StatusClient,
    pub health: Arc<HealthState>,
    pub shutdown: ShutdownHandle,
    task: JoinHandle<KeeperResult<()>>,
}

impl RunningKeeper {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request shutdown and wait for the keeper to finish
    pub async fn stop(self) -> KeeperResult<()> {
        self.shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("keeper should stop within 10s")
            .expect("keeper task panicked")
    }
}

/// Poll an async condition every 25ms until it holds or `limit` elapses
pub async fn wait_until<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
