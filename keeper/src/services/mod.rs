//! Service implementations
//!
//! Real implementations of the keeper's service traits, plus the self-ping loop.
//! These are the production implementations that handle actual I/O.

pub mod output_forwarder;
pub mod process_launcher;
pub mod self_ping;

#[cfg(test)]
mod tests;

pub use process_launcher::{ProcessWorker, RealProcessLauncher};
pub use self_ping::SelfPinger;
