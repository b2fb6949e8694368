//! Defaults for newly created clusters.

use serde::{Deserialize, Serialize};

use crate::domain::{random_name, ClusterSpec, RegistryConfig, DEFAULT_NAME_PREFIX};

/// Shape of clusters created without an explicit spec.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterDefaults {
    /// Prefix of generated names (`<prefix>-<n>`).
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub workers: u32,
    #[serde(default = "default_api_address")]
    pub api_address: String,
    /// `0` auto-assigns from the network port range.
    #[serde(default)]
    pub api_port: u16,
    /// k3s node image; the engine default when unset.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub server_args: Vec<String>,
    /// Attach the shared registry when one is configured.
    #[serde(default = "default_registry")]
    pub registry: bool,
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

fn default_api_address() -> String {
    "0.0.0.0".to_string()
}

fn default_registry() -> bool {
    true
}

impl ClusterDefaults {
    /// Build a spec from these defaults.
    ///
    /// A missing `name` is generated from the prefix; `registry` is only
    /// wired in when these defaults allow it.
    #[must_use]
    pub fn spec(&self, name: Option<String>, registry: Option<RegistryConfig>) -> ClusterSpec {
        let name = name.unwrap_or_else(|| random_name(&self.name_prefix));
        ClusterSpec {
            name,
            workers: self.workers,
            api_address: self.api_address.clone(),
            api_port: self.api_port,
            registry: registry.filter(|_| self.registry),
            image: self.image.clone(),
            server_args: self.server_args.clone(),
        }
    }
}

impl Default for ClusterDefaults {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            workers: 0,
            api_address: default_api_address(),
            api_port: 0,
            image: None,
            server_args: Vec::new(),
            registry: default_registry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegistryMode;

    #[test]
    fn spec_generates_name_from_prefix() {
        let defaults = ClusterDefaults {
            name_prefix: "dev".into(),
            ..ClusterDefaults::default()
        };
        assert!(defaults.spec(None, None).name.starts_with("dev-"));
        assert_eq!(defaults.spec(Some("mine".into()), None).name, "mine");
    }

    #[test]
    fn registry_can_be_opted_out() {
        let registry = RegistryConfig::new(RegistryMode::ReadWrite, "reg", 5000);
        let off = ClusterDefaults {
            registry: false,
            ..ClusterDefaults::default()
        };
        assert!(off.spec(None, Some(registry.clone())).registry.is_none());
        assert!(ClusterDefaults::default()
            .spec(None, Some(registry))
            .registry
            .is_some());
    }
}
