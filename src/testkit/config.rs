//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use crate::domain::{RegistryConfig, RegistryMode};
use crate::infrastructure::config::network::NetworkConfig;
use crate::infrastructure::config::settings::Config;

/// Default config with host probing off, so tests never depend on what
/// else is listening on the machine.
pub fn config() -> Config {
    let mut config = Config::default();
    config.network = network(6500, 6600);
    config
}

/// Port range `[start, end)` without host probing.
pub fn network(start: u16, end: u16) -> NetworkConfig {
    NetworkConfig {
        port_range_start: start,
        port_range_end: end,
        max_attempts: u32::from(end - start),
        probe_host: false,
    }
}

/// The registry used by the lifecycle scenarios.
pub fn registry() -> RegistryConfig {
    RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5000)
}
