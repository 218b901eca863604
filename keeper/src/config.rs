//! Runtime configuration for the keeper
//!
//! `main.rs` maps command line arguments onto [`KeeperConfig`]; tests build it
//! directly.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{KeeperError, KeeperResult};

/// Listen port when neither `--port` nor `PORT` is given
pub const DEFAULT_PORT: u16 = 8080;

/// Delay between full liveness sweeps
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// How long a freshly launched worker must survive to count as started
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5);

/// Wait before retrying a worker whose launch failed
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(30);

/// Delay between self-pings
pub const DEFAULT_SELF_PING_INTERVAL: Duration = Duration::from_secs(300);

/// Delay before the first self-ping, so the server is accepting
pub const DEFAULT_SELF_PING_DELAY: Duration = Duration::from_secs(10);

/// Request timeout for self-pings
pub const DEFAULT_SELF_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable carrying the execution-mode marker to workers
pub const EXECUTION_MODE_VAR: &str = "DEPLOYMENT_MODE";

/// Marker value telling the bots to poll rather than register webhooks
pub const DEFAULT_EXECUTION_MODE: &str = "polling_keepalive";

/// How to launch one supervised worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The two bots this service was built to keep alive
    pub fn default_workers() -> Vec<WorkerSpec> {
        vec![
            WorkerSpec::new("teacher_bot", "python3", &["TelegramBot.py"]),
            WorkerSpec::new("student_bot", "python3", &["StudentBot.py"]),
        ]
    }

    fn validate_name(name: &str) -> KeeperResult<()> {
        if name.is_empty() {
            return Err(KeeperError::config("worker", "worker name must not be empty"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(KeeperError::config(
                "worker",
                format!("worker name '{name}' may only contain letters, digits, '_' and '-'"),
            ));
        }
        Ok(())
    }
}

/// Parses `name=program arg1 arg2 ...`
impl FromStr for WorkerSpec {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, command) = s
            .split_once('=')
            .ok_or_else(|| KeeperError::config("worker", format!("expected name=command, got '{s}'")))?;

        let name = name.trim();
        Self::validate_name(name)?;

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| KeeperError::config("worker", format!("worker '{name}' has no command")))?;

        Ok(Self {
            name: name.to_string(),
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Complete keeper configuration
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    pub bind_addr: SocketAddr,
    pub workers: Vec<WorkerSpec>,
    pub poll_interval: Duration,
    pub grace_window: Duration,
    pub restart_cooldown: Duration,
    /// `None` disables the self-ping loop
    pub self_ping: Option<SelfPingConfig>,
    pub execution_mode: String,
}

/// Schedule of the self-ping loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfPingConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub timeout: Duration,
}

impl Default for SelfPingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SELF_PING_INTERVAL,
            initial_delay: DEFAULT_SELF_PING_DELAY,
            timeout: DEFAULT_SELF_PING_TIMEOUT,
        }
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            workers: WorkerSpec::default_workers(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_window: DEFAULT_GRACE_WINDOW,
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
            self_ping: Some(SelfPingConfig::default()),
            execution_mode: DEFAULT_EXECUTION_MODE.to_string(),
        }
    }
}

impl KeeperConfig {
    /// Reject configurations the loops cannot run with
    pub fn validate(&self) -> KeeperResult<()> {
        if self.poll_interval.is_zero() {
            return Err(KeeperError::config("poll_interval", "must be greater than zero"));
        }
        if self.restart_cooldown.is_zero() {
            return Err(KeeperError::config("restart_cooldown", "must be greater than zero"));
        }
        if let Some(ping) = &self.self_ping {
            if ping.interval.is_zero() {
                return Err(KeeperError::config("self_ping_interval", "must be greater than zero"));
            }
        }

        let mut names: Vec<&str> = self.workers.iter().map(|w| w.name.as_str()).collect();
        for name in &names {
            WorkerSpec::validate_name(name)?;
        }
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(KeeperError::config("worker", format!("duplicate worker name '{}'", pair[0])));
        }
        Ok(())
    }
}
