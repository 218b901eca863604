//! Keep-alive supervisor for long-running bot processes
//!
//! Launches the configured workers as child processes, restarts them when they
//! die, and exposes a small HTTP status surface that external uptime pingers
//! can poll.

pub mod config;
pub mod core;
pub mod error;
pub mod keeper;
pub mod services;
pub mod traits;
pub mod web;

// Re-export commonly used types
pub use config::{KeeperConfig, SelfPingConfig, WorkerSpec};
pub use core::{HealthState, RestartRequest, Supervisor, SupervisorConfig, WorkerState};
pub use error::{KeeperError, KeeperResult};
pub use keeper::{Keeper, ShutdownHandle};
pub use traits::{WorkerHandle, WorkerLauncher};
