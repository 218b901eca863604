//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

static COMPONENT_ID: OnceLock<ComponentId> = OnceLock::new();
static UNSET: ComponentId = ComponentId::Unset;

/// Identifier for the binary emitting log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    /// Supervisor + status endpoint service
    Keeper,
    /// External pinger utility
    Pinger,
    /// Library code running before (or without) an init call, e.g. in tests
    Unset,
}

impl ComponentId {
    /// Initialize the global component ID for the keeper service
    pub fn init_keeper() -> &'static ComponentId {
        COMPONENT_ID.get_or_init(|| ComponentId::Keeper)
    }

    /// Initialize the global component ID for the external pinger
    pub fn init_pinger() -> &'static ComponentId {
        COMPONENT_ID.get_or_init(|| ComponentId::Pinger)
    }

    /// Get the global component ID, `Unset` if no init call happened
    pub fn current() -> &'static ComponentId {
        COMPONENT_ID.get().unwrap_or(&UNSET)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Keeper => write!(f, "keeper"),
            ComponentId::Pinger => write!(f, "pinger"),
            ComponentId::Unset => write!(f, "unset"),
        }
    }
}

/// Aggregate health derived from the last-polled worker statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every tracked worker was alive at the last poll
    Healthy,
    /// At least one tracked worker was not alive at the last poll
    Partial,
}

impl HealthStatus {
    pub fn from_workers<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        if statuses.into_iter().all(|running| running) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Partial
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Partial => write!(f, "partial"),
        }
    }
}

/// JSON key under which a worker's running flag is reported in `/health`
pub fn running_key(worker: &str) -> String {
    format!("{worker}_running")
}

/// Format an uptime as `H:MM:SS`, prefixed with `N day(s), ` past 24 hours
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    match days {
        0 => format!("{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("1 day, {hours}:{minutes:02}:{seconds:02}"),
        n => format!("{n} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}
