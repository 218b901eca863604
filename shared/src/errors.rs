//! Shared error types for the keep-alive system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid URL: {input}")]
    InvalidUrl { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} responded with status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl SharedError {
    /// Classify a reqwest failure against the URL it was issued for
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SharedError::Timeout { url: url.to_string() }
        } else if err.is_decode() {
            SharedError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            SharedError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            SharedError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// True for failures of the transport or the remote side, as opposed to local misconfiguration
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SharedError::Timeout { .. }
                | SharedError::Network { .. }
                | SharedError::UnexpectedStatus { .. }
                | SharedError::Decode { .. }
        )
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
