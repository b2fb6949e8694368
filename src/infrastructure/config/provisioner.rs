//! Provisioning engine (k3d) settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Binaries and timing used by the k3d-backed provisioner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionerConfig {
    #[serde(default = "default_k3d")]
    pub k3d: String,
    #[serde(default = "default_docker")]
    pub docker: String,
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
    /// How long k3d waits for the server to become ready.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Directory for per-cluster kubeconfig files.
    #[serde(default)]
    pub kubeconfig_dir: Option<PathBuf>,
}

fn default_k3d() -> String {
    "k3d".to_string()
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_wait_secs() -> u64 {
    60
}

impl ProvisionerConfig {
    #[must_use]
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    #[must_use]
    pub fn resolved_kubeconfig_dir(&self) -> PathBuf {
        self.kubeconfig_dir
            .clone()
            .unwrap_or_else(|| super::home_dir().join("kubeconfigs"))
    }
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            k3d: default_k3d(),
            docker: default_docker(),
            kubectl: default_kubectl(),
            wait_secs: default_wait_secs(),
            kubeconfig_dir: None,
        }
    }
}
