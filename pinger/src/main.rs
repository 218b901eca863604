//! Main entry point for the pinger binary

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};

use pinger::{Pinger, DEFAULT_HEALTH_EVERY, DEFAULT_INTERVAL_MINUTES};
use shared::{logging, process_info, ComponentId, StatusClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Check health and keep-alive once, exit 0 only if both pass
    Once,
    /// Ping on a fixed interval until Ctrl+C
    Continuous,
}

/// Keeps a remote keeper instance awake by calling its keep-alive endpoint
#[derive(Parser, Debug)]
#[command(name = "pinger")]
#[command(about = "External keep-alive pinger for a deployed keeper")]
pub struct Args {
    /// Base URL of the keeper, e.g. https://my-bot.example.com
    pub url: String,

    /// Run mode
    #[arg(long, value_enum, default_value_t = Mode::Continuous)]
    pub mode: Mode,

    /// Minutes between pings in continuous mode
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MINUTES)]
    pub interval: u64,

    /// Check /health on every Nth ping
    #[arg(long, default_value_t = DEFAULT_HEALTH_EVERY, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_every: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let args = Args::parse();

    ComponentId::init_pinger();
    logging::init_tracing(Some(&args.log_level));

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            logging::log_error(ComponentId::current(), "Pinger", &format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let client = StatusClient::new(&args.url).with_context(|| format!("invalid keeper URL '{}'", args.url))?;
    let mut pinger = Pinger::new(client, args.health_every);

    logging::log_startup(ComponentId::current(), "external bot pinger");
    process_info!(ComponentId::current(), "🎯 Target: {}", pinger.target());

    match args.mode {
        Mode::Once => {
            let ok = pinger.run_once().await;
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Mode::Continuous => {
            if args.interval == 0 {
                bail!("--interval must be at least 1 minute in continuous mode");
            }

            let interval = Duration::from_secs(args.interval.saturating_mul(60));
            pinger
                .run_continuous(interval, async {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            process_info!(ComponentId::current(), "🛑 Pinger stopped by user");
                        }
                        // No signal handler: run until killed
                        Err(_) => std::future::pending::<()>().await,
                    }
                })
                .await;

            logging::log_shutdown(ComponentId::current(), "pinger stopped");
            Ok(ExitCode::SUCCESS)
        }
    }
}
