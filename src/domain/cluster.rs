//! Cluster entity, its lifecycle states and the spec it is created from.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ClusterId;
use super::registry::RegistryConfig;

/// Characters that cannot appear in container, network or volume names.
pub const INVALID_NAME_CHARS: &[char] = &[',', ' ', '/', '[', ']'];

/// Lifecycle state of a cluster.
///
/// `Destroyed` is never stored: a destroyed cluster is removed from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterState {
    Provisioning,
    Standby,
    Active,
    Destroying,
    Destroyed,
}

impl ClusterState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Standby => "standby",
            Self::Active => "active",
            Self::Destroying => "destroying",
            Self::Destroyed => "destroyed",
        }
    }

    /// Fully provisioned and not being torn down.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Standby | Self::Active)
    }

    /// In the middle of a transition driven by an external call.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Provisioning | Self::Destroying)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to (re)create a cluster.
///
/// Recycling creates the replacement from the retired cluster's spec with a
/// fresh name, so the spec is kept on the cluster record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub workers: u32,
    pub api_address: String,
    /// Requested API server port, `0` to auto-assign.
    pub api_port: u16,
    pub registry: Option<RegistryConfig>,
    pub image: Option<String>,
    pub server_args: Vec<String>,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers: 0,
            api_address: "0.0.0.0".to_string(),
            api_port: 0,
            registry: None,
            image: None,
            server_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Same spec under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Check the spec before anything is reserved for it.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the name is empty or contains
    /// characters the container runtime rejects.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("cluster name cannot be empty".to_string());
        }
        if let Some(c) = self.name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
            return Err(format!("cluster name '{}' contains invalid character '{c}'", self.name));
        }
        if self.api_address.trim().is_empty() {
            return Err("API address cannot be empty".to_string());
        }
        Ok(())
    }
}

/// One managed cluster, as seen through a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub spec: ClusterSpec,
    pub state: ClusterState,
    /// Port actually reserved for the API server.
    pub api_port: u16,
    pub registry_attached: bool,
    pub master_ip: Option<String>,
    pub kubeconfig_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl Cluster {
    /// A freshly reserved cluster, about to be provisioned.
    #[must_use]
    pub fn provisioning(spec: ClusterSpec, api_port: u16, registry_attached: bool) -> Self {
        Self {
            id: ClusterId::new(),
            spec,
            state: ClusterState::Provisioning,
            api_port,
            registry_attached,
            master_ip: None,
            kubeconfig_path: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[must_use]
    pub const fn worker_count(&self) -> u32 {
        self.spec.workers
    }

    #[must_use]
    pub fn api_address(&self) -> &str {
        &self.spec.api_address
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, ClusterState::Active)
    }

    /// The registry this cluster is wired to, if it attached one.
    #[must_use]
    pub fn registry(&self) -> Option<&RegistryConfig> {
        if self.registry_attached {
            self.spec.registry.as_ref()
        } else {
            None
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.spec.name, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegistryMode;

    #[test]
    fn spec_rejects_empty_name() {
        assert!(ClusterSpec::new("  ").validate().is_err());
    }

    #[test]
    fn spec_rejects_invalid_characters() {
        for name in ["a b", "a/b", "a,b", "a[0]"] {
            let err = ClusterSpec::new(name).validate().unwrap_err();
            assert!(err.contains("invalid character"), "{name}: {err}");
        }
    }

    #[test]
    fn spec_accepts_regular_name() {
        assert!(ClusterSpec::new("k3s-cluster-12").validate().is_ok());
    }

    #[test]
    fn renamed_keeps_everything_else() {
        let spec = ClusterSpec::new("c1")
            .with_workers(2)
            .with_api_port(6550)
            .with_registry(RegistryConfig::new(RegistryMode::ReadWrite, "reg", 5000));
        let copy = spec.renamed("c2");
        assert_eq!(copy.name, "c2");
        assert_eq!(copy.workers, 2);
        assert_eq!(copy.api_port, 6550);
        assert_eq!(copy.registry, spec.registry);
    }

    #[test]
    fn registry_only_reported_when_attached() {
        let spec = ClusterSpec::new("c1")
            .with_registry(RegistryConfig::new(RegistryMode::ReadWrite, "reg", 5000));
        let detached = Cluster::provisioning(spec.clone(), 6500, false);
        let attached = Cluster::provisioning(spec, 6501, true);
        assert!(detached.registry().is_none());
        assert_eq!(attached.registry().map(|r| r.port), Some(5000));
    }

    #[test]
    fn ready_and_transient_states() {
        assert!(ClusterState::Standby.is_ready());
        assert!(ClusterState::Active.is_ready());
        assert!(!ClusterState::Provisioning.is_ready());
        assert!(ClusterState::Destroying.is_transient());
        assert!(!ClusterState::Active.is_transient());
    }
}
