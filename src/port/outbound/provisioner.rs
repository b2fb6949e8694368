//! Provisioning engine port.
//!
//! The engine creates the containers that form a cluster's control plane and
//! workers. Calls are slow (seconds to minutes) and may complete in any order
//! relative to calls for other clusters.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{Cluster, ClusterId, RegistryConfig};
use crate::error::Result;

/// Parameters for a single provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub id: ClusterId,
    pub name: String,
    pub workers: u32,
    pub api_address: String,
    pub api_port: u16,
    /// Shared registry to wire in, when the cluster attached one.
    pub registry: Option<RegistryConfig>,
    pub image: Option<String>,
    pub server_args: Vec<String>,
}

impl ProvisionRequest {
    /// Build the request for a cluster that has its port (and registry) reserved.
    #[must_use]
    pub fn for_cluster(cluster: &Cluster) -> Self {
        Self {
            id: cluster.id,
            name: cluster.spec.name.clone(),
            workers: cluster.spec.workers,
            api_address: cluster.spec.api_address.clone(),
            api_port: cluster.api_port,
            registry: cluster.registry().cloned(),
            image: cluster.spec.image.clone(),
            server_args: cluster.spec.server_args.clone(),
        }
    }
}

/// What the engine reports back once a cluster is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedCluster {
    pub master_ip: String,
    pub kubeconfig_path: PathBuf,
}

/// A cluster found running by [`Provisioner::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCluster {
    pub name: String,
    pub workers: u32,
    pub api_port: u16,
    pub master_ip: Option<String>,
    pub kubeconfig_path: Option<PathBuf>,
}

/// Creates and destroys clusters.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Bring up a cluster. Must clean up after itself on failure.
    async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionedCluster>;

    /// Tear down a cluster previously returned by [`provision`](Self::provision)
    /// or [`discover`](Self::discover).
    async fn teardown(&self, cluster: &Cluster) -> Result<()>;

    /// List clusters the engine is already running.
    ///
    /// Used once at startup to adopt clusters left behind by a previous
    /// process. Engines that cannot enumerate return an empty list.
    async fn discover(&self) -> Result<Vec<DiscoveredCluster>> {
        Ok(Vec::new())
    }

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}
