//! Lifecycle hook invocations and their environment contract.

use std::fmt;

use super::cluster::Cluster;
use super::registry::RegistryConfig;

/// Which lifecycle step a hook script runs after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    Create,
    Destroy,
}

impl HookAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hook run: the action, the cluster it concerns and the
/// environment variables handed to the script.
#[derive(Debug, Clone)]
pub struct HookInvocation {
    pub action: HookAction,
    pub cluster: Cluster,
    pub env: Vec<(String, String)>,
}

impl HookInvocation {
    /// Build the invocation for `cluster`.
    ///
    /// `ACTION` and `CLUSTER_NAME` are always set. Registry, master IP and
    /// kubeconfig variables are only set once the cluster was fully
    /// provisioned (`provisioned == true`); a failed provisioning only gets
    /// the first two. With a non-empty `prefix` every name becomes
    /// `<prefix>_<NAME>`.
    #[must_use]
    pub fn new(action: HookAction, cluster: Cluster, provisioned: bool, prefix: &str) -> Self {
        let key = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}_{name}")
            }
        };

        let mut env = vec![
            (key("ACTION"), action.as_str().to_string()),
            (key("CLUSTER_NAME"), cluster.name().to_string()),
        ];

        if provisioned {
            if let Some(RegistryConfig { name, port, .. }) = cluster.registry() {
                env.push((key("REGISTRY_ENABLED"), "1".to_string()));
                env.push((key("REGISTRY_NAME"), name.clone()));
                env.push((key("REGISTRY_PORT"), port.to_string()));
            }
            if let Some(ip) = &cluster.master_ip {
                env.push((key("MASTER_IP"), ip.clone()));
            }
            if let Some(path) = &cluster.kubeconfig_path {
                env.push((key("KUBECONFIG"), path.display().to_string()));
            }
        }

        Self {
            action,
            cluster,
            env,
        }
    }

    /// Look up a variable by its full (prefixed) name.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
