//! Shared image registry configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the shared registry behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryMode {
    /// No registry.
    #[default]
    Disabled,
    /// Regular registry: clusters push and pull images.
    ReadWrite,
    /// Pull-through cache of an upstream registry; pushes are rejected.
    PullThroughCache,
}

impl RegistryMode {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::ReadWrite => "read-write",
            Self::PullThroughCache => "pull-through-cache",
        }
    }
}

impl fmt::Display for RegistryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and storage of the shared registry requested by a cluster.
///
/// Two requests are compatible when they agree on mode, name and port; the
/// volume is fixed by whichever request created the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub mode: RegistryMode,
    pub name: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
}

impl RegistryConfig {
    pub fn new(mode: RegistryMode, name: impl Into<String>, port: u16) -> Self {
        Self {
            mode,
            name: name.into(),
            port,
            volume: None,
        }
    }

    #[must_use]
    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    /// True when `other` may share the registry described by `self`.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.mode == other.mode && self.name == other.name && self.port == other.port
    }

    /// `name:port`, the address clusters pull from.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }
}

impl fmt::Display for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address(), self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_ignores_volume() {
        let a = RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5000)
            .with_volume("images");
        let b = RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5000);
        assert!(a.is_compatible_with(&b));
    }

    #[test]
    fn compatibility_requires_same_mode_name_and_port() {
        let base = RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5000);
        let other_mode =
            RegistryConfig::new(RegistryMode::PullThroughCache, "registry.localhost", 5000);
        let other_port = RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5001);
        let other_name = RegistryConfig::new(RegistryMode::ReadWrite, "other.localhost", 5000);

        assert!(!base.is_compatible_with(&other_mode));
        assert!(!base.is_compatible_with(&other_port));
        assert!(!base.is_compatible_with(&other_name));
    }

    #[test]
    fn mode_deserializes_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: RegistryMode,
        }
        let w: Wrapper = toml::from_str("mode = \"pull-through-cache\"").unwrap();
        assert_eq!(w.mode, RegistryMode::PullThroughCache);
        assert!(w.mode.is_enabled());
        assert!(!RegistryMode::Disabled.is_enabled());
    }
}
