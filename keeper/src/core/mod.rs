//! Core keeper logic: shared health state and the worker supervisor

pub mod state;
pub mod supervisor;

pub use state::{HealthState, PingRecord};
pub use supervisor::{RestartRequest, Supervisor, SupervisorConfig, WorkerState};
