//! HTTP client for the keeper's status surface
//!
//! Used by the keeper's own self-ping loop and by the external pinger.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::{SharedError, SharedResult};
use crate::messages::{HealthReport, KeepAliveResponse};

/// Timeout the external monitor historically used for `/keep-alive`
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout the external monitor historically used for `/health`
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for `/keep-alive`, `/health` and `/ping` on one base URL
#[derive(Clone, Debug)]
pub struct StatusClient {
    base_url: Url,
    client: reqwest::Client,
    keep_alive_timeout: Duration,
    health_timeout: Duration,
}

impl StatusClient {
    /// Create a client for a base URL; `host:port` without a scheme is treated as `http://`
    pub fn new(base_url: &str) -> SharedResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let base_url = Url::parse(&with_scheme).map_err(|_| SharedError::InvalidUrl {
            input: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(SharedError::InvalidUrl {
                input: base_url.to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("keepalive-status-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SharedError::InvalidConfig {
                field: "http_client".to_string(),
                value: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            client,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        })
    }

    /// Use one timeout for every request (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self.health_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /keep-alive`, which also counts as a ping on the server
    pub async fn keep_alive(&self) -> SharedResult<KeepAliveResponse> {
        self.get_json("keep-alive", self.keep_alive_timeout).await
    }

    /// `GET /health`
    pub async fn health(&self) -> SharedResult<HealthReport> {
        self.get_json("health", self.health_timeout).await
    }

    /// `GET /ping`, returning the raw body
    pub async fn ping(&self) -> SharedResult<String> {
        let url = self.endpoint("ping");
        let response = self
            .client
            .get(url.clone())
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| SharedError::from_request(url.as_str(), e))?;

        Self::check_status(url.as_str(), response.status())?;
        response
            .text()
            .await
            .map_err(|e| SharedError::from_request(url.as_str(), e))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, timeout: Duration) -> SharedResult<T> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SharedError::from_request(url.as_str(), e))?;

        Self::check_status(url.as_str(), response.status())?;
        response.json::<T>().await.map_err(|e| SharedError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        // Keep any path prefix on the base URL (e.g. behind a proxy)
        let mut url = self.base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }

    fn check_status(url: &str, status: StatusCode) -> SharedResult<()> {
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(SharedError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
