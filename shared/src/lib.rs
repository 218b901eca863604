//! Shared types for the keep-alive system
//!
//! Contains what both the `keeper` service and the external `pinger` need:
//! the error taxonomy, process-aware logging, the JSON bodies served by the
//! status endpoints and an HTTP client for calling them.

pub mod client;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use client::StatusClient;
pub use errors::*;
pub use messages::{HealthReport, KeepAliveResponse, RestartResponse};
pub use types::*;
