//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section is optional; an empty file yields the defaults.
//!
//! # Example
//!
//! ```no_run
//! use kpool::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("kpool.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::cluster::ClusterDefaults;
use super::hooks::HookConfig;
use super::kubeconfig::KubeconfigConfig;
use super::logging::LoggingConfig;
use super::network::NetworkConfig;
use super::pool::PoolConfig;
use super::provisioner::ProvisionerConfig;
use super::registry::RegistrySettings;
use crate::application::hook::HookSettings;
use crate::application::network::PortPolicy;
use crate::application::orchestrator::OrchestratorSettings;
use crate::domain::INVALID_NAME_CHARS;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Shape of clusters created without an explicit spec.
    #[serde(default)]
    pub cluster: ClusterDefaults,

    /// API server port allocation.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Shared image registry.
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Lifecycle hook scripts.
    #[serde(default)]
    pub hooks: HookConfig,

    /// User kubeconfig merging.
    #[serde(default)]
    pub kubeconfig: KubeconfigConfig,

    /// k3d, docker and kubectl binaries.
    #[serde(default)]
    pub provisioner: ProvisionerConfig,

    /// Standby pool sizing and shutdown.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Config {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Render the configuration back to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::Render)?)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first field found out of range.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        let network = &self.network;
        if network.port_range_start == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.port_range_start",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if network.port_range_end <= network.port_range_start {
            return Err(ConfigError::InvalidValue {
                field: "network.port_range_end",
                reason: format!(
                    "must be greater than port_range_start ({})",
                    network.port_range_start
                ),
            }
            .into());
        }
        if network.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.max_attempts",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.hooks.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hooks.timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.registry.mode.is_enabled() {
            if self.registry.name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "registry.name",
                }
                .into());
            }
            if let Some(c) = self.registry.name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
                return Err(ConfigError::InvalidValue {
                    field: "registry.name",
                    reason: format!("contains invalid character '{c}'"),
                }
                .into());
            }
            if self.registry.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "registry.port",
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
        }

        let prefix = &self.cluster.name_prefix;
        if prefix.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "cluster.name_prefix",
            }
            .into());
        }
        if let Some(c) = prefix.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
            return Err(ConfigError::InvalidValue {
                field: "cluster.name_prefix",
                reason: format!("contains invalid character '{c}'"),
            }
            .into());
        }

        if self.provisioner.wait_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provisioner.wait_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Settings the orchestrator core runs with.
    #[must_use]
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            ports: PortPolicy::from(&self.network),
            hooks: HookSettings::from(&self.hooks),
            name_prefix: self.cluster.name_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegistryMode;
    use crate::error::Error;

    #[test]
    fn orchestrator_settings_follow_config() {
        let config = Config::parse_toml(
            "[cluster]\nname_prefix = \"dev\"\n[network]\nport_range_start = 7000\nport_range_end = 7010\n[hooks]\ntimeout_secs = 5\n",
        )
        .unwrap();
        let settings = config.orchestrator_settings();
        assert_eq!(settings.name_prefix, "dev");
        assert_eq!(settings.ports.range_start, 7000);
        assert_eq!(settings.ports.range_end, 7010);
        assert_eq!(settings.hooks.timeout, std::time::Duration::from_secs(5));
    }

    fn invalid_field(err: Error) -> &'static str {
        match err {
            Error::Config(ConfigError::InvalidValue { field, .. })
            | Error::Config(ConfigError::MissingField { field }) => field,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.network.port_range_start, 6500);
        assert_eq!(config.network.port_range_end, 7500);
        assert_eq!(config.hooks.timeout_secs, 60);
        assert_eq!(config.cluster.name_prefix, "k3s-cluster");
        assert_eq!(config.registry.mode, RegistryMode::Disabled);
        assert_eq!(config.pool.standby, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_every_section() {
        let toml = r#"
            [logging]
            level = "debug"
            format = "json"

            [cluster]
            name_prefix = "dev"
            workers = 2
            server_args = ["--disable=traefik"]

            [network]
            port_range_start = 7000
            port_range_end = 7010
            probe_host = false

            [registry]
            mode = "pull-through-cache"
            name = "cache.localhost"
            port = 5001
            volume = "cache-images"

            [hooks]
            create = "/usr/local/bin/on-create"
            timeout_secs = 5
            env_prefix = "K3X"

            [kubeconfig]
            merge = false

            [provisioner]
            k3d = "/opt/k3d"
            wait_secs = 120

            [pool]
            standby = 3
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.cluster.workers, 2);
        assert_eq!(config.cluster.server_args, vec!["--disable=traefik"]);
        assert!(!config.network.probe_host);
        assert_eq!(config.registry.mode, RegistryMode::PullThroughCache);
        assert_eq!(config.registry.volume.as_deref(), Some("cache-images"));
        assert_eq!(config.hooks.env_prefix, "K3X");
        assert!(config.hooks.destroy.is_none());
        assert!(!config.kubeconfig.merge);
        assert_eq!(config.provisioner.k3d, "/opt/k3d");
        assert_eq!(config.provisioner.kubectl, "kubectl");
        assert_eq!(config.pool.standby, 3);
    }

    #[test]
    fn rejects_empty_port_range() {
        let err = Config::parse_toml("[network]\nport_range_start = 7000\nport_range_end = 7000\n")
            .unwrap_err();
        assert_eq!(invalid_field(err), "network.port_range_end");
    }

    #[test]
    fn rejects_zero_hook_timeout() {
        let err = Config::parse_toml("[hooks]\ntimeout_secs = 0\n").unwrap_err();
        assert_eq!(invalid_field(err), "hooks.timeout_secs");
    }

    #[test]
    fn registry_checked_only_when_enabled() {
        assert!(Config::parse_toml("[registry]\nport = 0\n").is_ok());
        let err = Config::parse_toml("[registry]\nmode = \"read-write\"\nport = 0\n").unwrap_err();
        assert_eq!(invalid_field(err), "registry.port");
    }

    #[test]
    fn rejects_invalid_name_prefix() {
        let err = Config::parse_toml("[cluster]\nname_prefix = \"my cluster\"\n").unwrap_err();
        assert_eq!(invalid_field(err), "cluster.name_prefix");
    }

    #[test]
    fn rejects_unknown_registry_mode() {
        let err = Config::parse_toml("[registry]\nmode = \"mirror\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn renders_back_to_toml() {
        let rendered = Config::default().to_toml().unwrap();
        let reparsed = Config::parse_toml(&rendered).unwrap();
        assert_eq!(reparsed.network.port_range_start, 6500);
        assert!(rendered.contains("[pool]"));
    }
}
