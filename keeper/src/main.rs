//! Main entry point for the keeper binary

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use keeper::{
    config::{DEFAULT_EXECUTION_MODE, DEFAULT_PORT, EXECUTION_MODE_VAR},
    services::RealProcessLauncher,
    Keeper, KeeperConfig, KeeperResult, SelfPingConfig, ShutdownHandle, WorkerSpec,
};
use shared::{logging, process_debug, process_info, ComponentId};

/// Keeps bot worker processes alive and serves a status surface for uptime pingers
#[derive(Parser, Debug)]
#[command(name = "keeper")]
#[command(about = "Supervises bot workers and serves /health, /keep-alive and /ping")]
pub struct Args {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Worker to supervise as `name=program args...` (repeatable, replaces the defaults)
    #[arg(long = "worker", value_name = "NAME=COMMAND")]
    pub workers: Vec<WorkerSpec>,

    /// Seconds between liveness sweeps
    #[arg(long, default_value_t = 120)]
    pub poll_interval_secs: u64,

    /// Seconds a new worker must stay up to count as started
    #[arg(long, default_value_t = 5)]
    pub grace_secs: u64,

    /// Seconds to wait before retrying a failed launch
    #[arg(long, default_value_t = 30)]
    pub cooldown_secs: u64,

    /// Seconds between self-pings
    #[arg(long, default_value_t = 300)]
    pub self_ping_interval_secs: u64,

    /// Seconds before the first self-ping
    #[arg(long, default_value_t = 10)]
    pub self_ping_delay_secs: u64,

    /// Disable the self-ping loop
    #[arg(long)]
    pub no_self_ping: bool,

    /// Execution-mode marker passed to every worker
    #[arg(long, env = EXECUTION_MODE_VAR, default_value = DEFAULT_EXECUTION_MODE)]
    pub execution_mode: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    fn into_config(self) -> KeeperConfig {
        let workers = if self.workers.is_empty() {
            WorkerSpec::default_workers()
        } else {
            self.workers
        };

        let self_ping = (!self.no_self_ping).then(|| SelfPingConfig {
            interval: Duration::from_secs(self.self_ping_interval_secs),
            initial_delay: Duration::from_secs(self.self_ping_delay_secs),
            ..SelfPingConfig::default()
        });

        KeeperConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            workers,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            grace_window: Duration::from_secs(self.grace_secs),
            restart_cooldown: Duration::from_secs(self.cooldown_secs),
            self_ping,
            execution_mode: self.execution_mode,
        }
    }
}

#[tokio::main]
async fn main() -> KeeperResult<()> {
    // .env is optional
    dotenv::dotenv().ok();

    let args = Args::parse();

    ComponentId::init_keeper();
    logging::init_tracing(Some(&args.log_level));

    let config = args.into_config();
    logging::log_startup(ComponentId::current(), "keep-alive supervisor");
    for worker in &config.workers {
        process_debug!(ComponentId::current(), "👷 Worker: {}", worker);
    }

    let launcher = RealProcessLauncher::new()
        .with_grace_window(config.grace_window)
        .with_execution_mode(config.execution_mode.clone());

    let keeper = match Keeper::new(config, launcher) {
        Ok(keeper) => keeper,
        Err(e) => {
            logging::log_error(ComponentId::current(), "Configuration", &e);
            return Err(e);
        }
    };

    tokio::spawn(forward_signals(keeper.shutdown_handle()));

    if let Err(e) = keeper.run().await {
        logging::log_error(ComponentId::current(), "Keeper", &e);
        return Err(e);
    }

    Ok(())
}

/// Translate Ctrl+C (and SIGTERM on unix) into a graceful shutdown
async fn forward_signals(handle: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        process_info!(ComponentId::current(), "📡 Received Ctrl+C");
                    }
                    _ = sigterm.recv() => {
                        process_info!(ComponentId::current(), "📡 Received SIGTERM");
                    }
                }
                handle.shutdown();
                return;
            }
            Err(e) => {
                process_debug!(ComponentId::current(), "SIGTERM handler unavailable: {}", e);
            }
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        process_info!(ComponentId::current(), "📡 Received Ctrl+C");
        handle.shutdown();
    }
}
