//! Real worker launcher implementation
//!
//! Spawns each worker as an OS child process, with the keeper's environment
//! passed through plus the execution-mode marker, and checks it is still
//! alive after the grace window.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::{Child, Command};

use shared::{process_debug, process_warn, ComponentId};

use crate::config::{WorkerSpec, DEFAULT_EXECUTION_MODE, DEFAULT_GRACE_WINDOW, EXECUTION_MODE_VAR};
use crate::error::{KeeperError, KeeperResult};
use crate::services::output_forwarder::{configure_child_stdio, spawn_output_forwarders};
use crate::traits::{WorkerHandle, WorkerLauncher};

/// Launches workers as child processes
#[derive(Debug, Clone)]
pub struct RealProcessLauncher {
    /// How long a new process must stay up before it counts as started
    grace_window: Duration,

    /// Value of the execution-mode marker passed to every worker
    execution_mode: String,

    /// Forward worker stdout/stderr into the keeper log
    forward_output: bool,
}

impl Default for RealProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl RealProcessLauncher {
    /// Create launcher with default settings
    pub fn new() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            execution_mode: DEFAULT_EXECUTION_MODE.to_string(),
            forward_output: true,
        }
    }

    /// Configure grace window (fluent API)
    pub fn with_grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;
        self
    }

    /// Configure execution-mode marker (fluent API)
    pub fn with_execution_mode(mut self, execution_mode: impl Into<String>) -> Self {
        self.execution_mode = execution_mode.into();
        self
    }

    /// Configure output forwarding (fluent API)
    pub fn with_output_forwarding(mut self, forward_output: bool) -> Self {
        self.forward_output = forward_output;
        self
    }

    fn build_command(&self, spec: &WorkerSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).env(EXECUTION_MODE_VAR, &self.execution_mode);
        configure_child_stdio(&mut cmd, self.forward_output);
        cmd
    }
}

#[async_trait]
impl WorkerLauncher for RealProcessLauncher {
    async fn launch(&self, spec: &WorkerSpec) -> KeeperResult<Box<dyn WorkerHandle>> {
        let mut child = self
            .build_command(spec)
            .spawn()
            .map_err(|e| KeeperError::launch(&spec.name, format!("failed to spawn '{}': {e}", spec.program)))?;

        let pid = child.id();
        if self.forward_output {
            spawn_output_forwarders(&mut child, &spec.name);
        }

        process_debug!(
            ComponentId::current(),
            worker = %spec.name,
            "🏭 Spawned {} (PID: {:?}), waiting {:?} grace window",
            spec,
            pid,
            self.grace_window
        );

        tokio::time::sleep(self.grace_window).await;

        match child.try_wait() {
            Ok(None) => Ok(Box::new(ProcessWorker::new(spec.name.clone(), pid, child))),
            Ok(Some(status)) => Err(KeeperError::launch(
                &spec.name,
                format!("exited with {status} within the {:?} grace window", self.grace_window),
            )),
            Err(e) => {
                if let Err(kill_err) = child.start_kill() {
                    process_warn!(
                        ComponentId::current(),
                        worker = %spec.name,
                        "⚠️ Could not kill {}: {}",
                        spec.name,
                        kill_err
                    );
                }
                Err(KeeperError::launch(&spec.name, format!("could not inspect process: {e}")))
            }
        }
    }
}

/// Handle for a worker running as a child process
#[derive(Debug)]
pub struct ProcessWorker {
    name: String,
    pid: Option<u32>,
    child: Option<Child>,
}

impl ProcessWorker {
    fn new(name: String, pid: Option<u32>, child: Child) -> Self {
        Self {
            name,
            pid,
            child: Some(child),
        }
    }
}

#[async_trait]
impl WorkerHandle for ProcessWorker {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_alive(&mut self) -> KeeperResult<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };

        match child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) => {
                process_debug!(ComponentId::current(), worker = %self.name, "{} exited with {}", self.name, status);
                Ok(false)
            }
            Err(e) => Err(KeeperError::poll(&self.name, e.to_string())),
        }
    }

    async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        request_termination(&mut child, &self.name);

        // Reap in the background; termination is not awaited
        let name = self.name.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    process_debug!(ComponentId::current(), worker = %name, "{} terminated with {}", name, status);
                }
                Err(e) => {
                    process_warn!(ComponentId::current(), worker = %name, "⚠️ Could not reap {}: {}", name, e);
                }
            }
        });
    }
}

/// Ask a child to exit: SIGTERM where available, kill otherwise
fn request_termination(child: &mut Child, name: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => return,
            Err(e) => {
                process_warn!(ComponentId::current(), worker = %name, "⚠️ SIGTERM to {} failed: {}, killing", name, e);
            }
        }
    }

    if let Err(e) = child.start_kill() {
        process_warn!(ComponentId::current(), worker = %name, "⚠️ Could not kill {}: {}", name, e);
    }
}
