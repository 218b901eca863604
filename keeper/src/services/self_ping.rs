//! Periodic self-ping
//!
//! Calls the keeper's own `/keep-alive` endpoint so the process shows inbound
//! traffic even when no external pinger is configured. Failures are logged
//! and never stop the loop.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use shared::{process_debug, process_info, process_warn, ComponentId, StatusClient};

use crate::config::SelfPingConfig;
use crate::error::KeeperResult;

pub struct SelfPinger {
    client: StatusClient,
    config: SelfPingConfig,
}

impl SelfPinger {
    /// Pinger targeting the server bound at `local_addr`
    ///
    /// A wildcard bind address is reached through loopback.
    pub fn for_local_addr(local_addr: SocketAddr, config: SelfPingConfig) -> KeeperResult<Self> {
        let ip = match local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        let target = SocketAddr::new(ip, local_addr.port());
        let client = StatusClient::new(&format!("http://{target}"))?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: StatusClient, config: SelfPingConfig) -> Self {
        let client = client.with_timeout(config.timeout);
        Self { client, config }
    }

    pub fn target(&self) -> &url::Url {
        self.client.base_url()
    }

    /// One keep-alive request; returns whether it succeeded
    pub async fn ping_once(&self) -> bool {
        match self.client.keep_alive().await {
            Ok(response) => {
                process_info!(
                    ComponentId::current(),
                    "✅ Self-ping successful (total pings: {})",
                    response.ping_count
                );
                true
            }
            Err(e) => {
                process_warn!(ComponentId::current(), "⚠️ Self-ping failed: {}", e);
                false
            }
        }
    }

    /// Ping after the initial delay, then every interval, until shutdown
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        process_debug!(
            ComponentId::current(),
            "🏓 Self-ping to {} every {}s, first in {}s",
            self.client.base_url(),
            self.config.interval.as_secs_f32(),
            self.config.initial_delay.as_secs_f32()
        );

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(self.config.initial_delay) => {}
        }

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.ping_once().await;
                }
            }
        }

        process_debug!(ComponentId::current(), "Self-ping loop stopped");
    }
}
