//! Keeper-specific error types

use shared::SharedError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Worker {worker} failed to launch: {reason}")]
    Launch { worker: String, reason: String },

    #[error("Liveness check for worker {worker} failed: {reason}")]
    PollTransient { worker: String, reason: String },

    #[error("HTTP server could not bind {addr}: {source}")]
    ServerStartup {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {field}: {message}")]
    Config { field: String, message: String },

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KeeperError {
    pub fn launch(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        KeeperError::Launch {
            worker: worker.into(),
            reason: reason.into(),
        }
    }

    pub fn poll(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        KeeperError::PollTransient {
            worker: worker.into(),
            reason: reason.into(),
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        KeeperError::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type KeeperResult<T> = Result<T, KeeperError>;
