//! Shared registry settings.

use serde::{Deserialize, Serialize};

use crate::domain::{RegistryConfig, RegistryMode};

/// Shared registry configuration.
///
/// Clusters created while `mode` is not `disabled` attach to the registry
/// described here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrySettings {
    #[serde(default)]
    pub mode: RegistryMode,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Volume where images are stored; survives registry teardown.
    #[serde(default)]
    pub volume: Option<String>,
    /// Registry container image.
    #[serde(default = "default_image")]
    pub image: String,
    /// Upstream proxied in `pull-through-cache` mode.
    #[serde(default = "default_upstream")]
    pub upstream: String,
}

fn default_name() -> String {
    "registry.localhost".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_image() -> String {
    "registry:2".to_string()
}

fn default_upstream() -> String {
    "https://registry-1.docker.io".to_string()
}

impl RegistrySettings {
    /// The registry new clusters should attach to, or `None` when disabled.
    #[must_use]
    pub fn requested(&self) -> Option<RegistryConfig> {
        if !self.mode.is_enabled() {
            return None;
        }
        let config = RegistryConfig::new(self.mode, self.name.clone(), self.port);
        Some(match &self.volume {
            Some(volume) => config.with_volume(volume.clone()),
            None => config,
        })
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            mode: RegistryMode::Disabled,
            name: default_name(),
            port: default_port(),
            volume: None,
            image: default_image(),
            upstream: default_upstream(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_registry_requests_nothing() {
        assert!(RegistrySettings::default().requested().is_none());
    }

    #[test]
    fn enabled_registry_carries_volume() {
        let settings = RegistrySettings {
            mode: RegistryMode::ReadWrite,
            volume: Some("images".into()),
            ..RegistrySettings::default()
        };
        let requested = settings.requested().unwrap();
        assert_eq!(requested.address(), "registry.localhost:5000");
        assert_eq!(requested.volume.as_deref(), Some("images"));
    }
}
