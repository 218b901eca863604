//! Trait definitions with mockall annotations for testing
//!
//! The supervisor only sees workers through these two traits, so it can be
//! driven by mock workers in tests and by OS processes in production.

use crate::config::WorkerSpec;
use crate::error::KeeperResult;

/// Launches workers from their spec
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Launch a worker and wait out the grace window
    ///
    /// # Returns
    /// A handle to a worker that was still alive at the end of the grace window,
    /// or `KeeperError::Launch` if it could not be started or exited early
    async fn launch(&self, spec: &WorkerSpec) -> KeeperResult<Box<dyn WorkerHandle>>;
}

/// One running worker, exclusively owned by the supervisor
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerHandle: Send + Sync {
    /// OS process id, if the worker has one
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness check
    ///
    /// # Returns
    /// `Ok(false)` once the worker has exited, `KeeperError::PollTransient`
    /// if the check itself failed
    fn is_alive(&mut self) -> KeeperResult<bool>;

    /// Request termination without waiting for it
    async fn stop(&mut self);
}
