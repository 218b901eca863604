//! Keeper composition root
//!
//! Owns the shared health state and wires the HTTP server, the supervisor
//! loop and the self-ping loop together around one shutdown signal.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

use shared::{logging, process_debug, process_error, process_info, ComponentId};

use crate::config::KeeperConfig;
use crate::core::{HealthState, Supervisor, SupervisorConfig};
use crate::error::{KeeperError, KeeperResult};
use crate::services::SelfPinger;
use crate::traits::WorkerLauncher;
use crate::web::{build_router, AppState};

/// Cloneable trigger for a graceful shutdown
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request shutdown; idempotent
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Main keeper with an injected worker launcher
pub struct Keeper<L>
where
    L: WorkerLauncher + 'static,
{
    config: KeeperConfig,
    launcher: L,
    health: Arc<HealthState>,
    shutdown: ShutdownHandle,
}

impl<L> Keeper<L>
where
    L: WorkerLauncher + 'static,
{
    /// Create a keeper, rejecting invalid configuration
    pub fn new(config: KeeperConfig, launcher: L) -> KeeperResult<Self> {
        config.validate()?;

        let health = Arc::new(HealthState::new(config.workers.iter().map(|w| w.name.clone())));
        let (tx, _) = watch::channel(false);

        Ok(Self {
            config,
            launcher,
            health,
            shutdown: ShutdownHandle { tx: Arc::new(tx) },
        })
    }

    pub fn health(&self) -> Arc<HealthState> {
        self.health.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Bind the configured address; failure here is fatal
    pub async fn bind(&self) -> KeeperResult<TcpListener> {
        let addr = self.config.bind_addr;
        TcpListener::bind(addr)
            .await
            .map_err(|source| KeeperError::ServerStartup { addr, source })
    }

    /// Bind, then serve until shutdown
    pub async fn run(self) -> KeeperResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown is requested
    ///
    /// Workers are launched after the server is accepting, so `/health`
    /// answers during the initial grace window.
    pub async fn serve(self, listener: TcpListener) -> KeeperResult<()> {
        let Self {
            config,
            launcher,
            health,
            shutdown,
        } = self;

        let local_addr = listener.local_addr()?;
        let pinger = config
            .self_ping
            .map(|ping_config| SelfPinger::for_local_addr(local_addr, ping_config))
            .transpose()?;
        let (restart_tx, restart_rx) = mpsc::channel(1);

        // HTTP server
        let router = build_router(AppState::new(health.clone(), restart_tx));
        let mut server_shutdown = shutdown.subscribe();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown_requested(&mut server_shutdown).await })
                .await
        });
        process_info!(ComponentId::current(), "🌐 Status server listening on http://{}", local_addr);

        // Supervisor
        let mut supervisor = Supervisor::new(
            launcher,
            config.workers.clone(),
            health.clone(),
            SupervisorConfig::from(&config),
        );
        let supervisor_shutdown = shutdown.subscribe();
        let supervisor_task = tokio::spawn(async move {
            supervisor.start_all().await;
            supervisor.run(supervisor_shutdown, restart_rx).await;
        });

        // Self-ping
        let ping_task = match pinger {
            Some(pinger) => Some(tokio::spawn(pinger.run(shutdown.subscribe()))),
            None => {
                process_debug!(ComponentId::current(), "Self-ping disabled");
                None
            }
        };

        let mut waiter = shutdown.subscribe();
        let server_exit = tokio::select! {
            _ = shutdown_requested(&mut waiter) => None,
            result = &mut server => Some(result),
        };

        if server_exit.is_some() {
            process_error!(ComponentId::current(), "❌ Status server stopped unexpectedly");
        }
        shutdown.shutdown();

        supervisor_task.await?;
        if let Some(task) = ping_task {
            task.await?;
        }

        let served = match server_exit {
            Some(result) => result,
            None => server.await,
        };
        served??;

        logging::log_shutdown(ComponentId::current(), "keeper stopped");
        Ok(())
    }
}

/// Resolves once shutdown is requested or every sender is gone
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
