//! API server port allocation settings.

use serde::{Deserialize, Serialize};

use crate::application::network::PortPolicy;

/// Range and policy used to auto-assign API server ports.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// First port tried when a cluster asks for port `0`.
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    /// End of the auto-assign range (exclusive).
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
    /// Upper bound on candidate ports examined per reservation.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Skip ports something else on the host is already listening on.
    #[serde(default = "default_probe_host")]
    pub probe_host: bool,
}

fn default_port_range_start() -> u16 {
    6500
}

fn default_port_range_end() -> u16 {
    7500
}

fn default_max_attempts() -> u32 {
    1000
}

fn default_probe_host() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            max_attempts: default_max_attempts(),
            probe_host: default_probe_host(),
        }
    }
}

impl From<&NetworkConfig> for PortPolicy {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            range_start: config.port_range_start,
            range_end: config.port_range_end,
            max_attempts: config.max_attempts,
            probe_host: config.probe_host,
        }
    }
}
