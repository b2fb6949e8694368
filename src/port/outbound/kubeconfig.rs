//! Kubeconfig merger port.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{Cluster, ClusterId};
use crate::error::Result;

/// A per-cluster kubeconfig artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigEntry {
    pub id: ClusterId,
    pub name: String,
    pub path: PathBuf,
}

impl KubeconfigEntry {
    /// The entry for a provisioned cluster; `None` before provisioning finished.
    #[must_use]
    pub fn for_cluster(cluster: &Cluster) -> Option<Self> {
        cluster.kubeconfig_path.as_ref().map(|path| Self {
            id: cluster.id,
            name: cluster.spec.name.clone(),
            path: path.clone(),
        })
    }
}

/// Merges cluster kubeconfigs into the user's kubeconfig file.
#[async_trait]
pub trait KubeconfigMerger: Send + Sync {
    /// Merge `entry` into the user's file, making it the current context when
    /// `is_active`.
    async fn merge(&self, entry: &KubeconfigEntry, is_active: bool) -> Result<()>;

    /// Drop `entry` from the user's file.
    async fn remove(&self, entry: &KubeconfigEntry) -> Result<()>;
}
