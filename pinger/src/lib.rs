//! External keep-alive pinger
//!
//! Calls a remote keeper's `/keep-alive` and `/health` endpoints on a
//! schedule, from outside the keeper's host.

pub mod pinger;

pub use pinger::{PingStats, Pinger, DEFAULT_HEALTH_EVERY, DEFAULT_INTERVAL_MINUTES};
