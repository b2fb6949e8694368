//! Cluster pool sizing and shutdown settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Standby clusters kept ready next to the active one.
    #[serde(default = "default_standby")]
    pub standby: usize,
    /// Time background create/destroy tasks get to settle on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_standby() -> usize {
    1
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

impl PoolConfig {
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            standby: default_standby(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}
