//! Provisioning engine fake.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Cluster;
use crate::error::{Error, Result};
use crate::port::{DiscoveredCluster, ProvisionRequest, ProvisionedCluster, Provisioner};

/// A fake engine with per-name scripted failures and optional delays.
///
/// Provisioning succeeds unless the name was passed to
/// [`fail_provision`](Self::fail_provision); the same goes for teardown.
#[derive(Default)]
pub struct ScriptedProvisioner {
    provision_failures: Mutex<HashSet<String>>,
    teardown_failures: Mutex<HashSet<String>>,
    provision_delay: Mutex<Option<Duration>>,
    teardown_delay: Mutex<Option<Duration>>,
    discovered: Mutex<Vec<DiscoveredCluster>>,
    provisioned: Mutex<Vec<ProvisionRequest>>,
    torn_down: Mutex<Vec<String>>,
    next_ip: AtomicU32,
}

impl ScriptedProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail provisioning of the cluster called `name`.
    pub fn fail_provision(&self, name: &str) {
        self.provision_failures
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Fail teardown of the cluster called `name` until cleared.
    pub fn fail_teardown(&self, name: &str) {
        self.teardown_failures
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn clear_failures(&self) {
        self.provision_failures.lock().unwrap().clear();
        self.teardown_failures.lock().unwrap().clear();
    }

    /// Make every provision call take `delay`.
    pub fn set_provision_delay(&self, delay: Duration) {
        *self.provision_delay.lock().unwrap() = Some(delay);
    }

    /// Make every teardown call take `delay`.
    pub fn set_teardown_delay(&self, delay: Duration) {
        *self.teardown_delay.lock().unwrap() = Some(delay);
    }

    /// Clusters reported by `discover`.
    pub fn set_discovered(&self, clusters: Vec<DiscoveredCluster>) {
        *self.discovered.lock().unwrap() = clusters;
    }

    /// Every provision request received, in order.
    pub fn provisioned(&self) -> Vec<ProvisionRequest> {
        self.provisioned.lock().unwrap().clone()
    }

    /// Names of clusters torn down successfully, in order.
    pub fn torn_down(&self) -> Vec<String> {
        self.torn_down.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionedCluster> {
        self.provisioned.lock().unwrap().push(request.clone());
        let delay = *self.provision_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.provision_failures.lock().unwrap().contains(&request.name) {
            return Err(Error::command_failed(
                "k3d cluster create",
                format!("scripted failure for {}", request.name),
            ));
        }
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed) + 2;
        Ok(ProvisionedCluster {
            master_ip: format!("172.18.0.{n}"),
            kubeconfig_path: PathBuf::from(format!("/tmp/kpool-test/{}.yaml", request.name)),
        })
    }

    async fn teardown(&self, cluster: &Cluster) -> Result<()> {
        let delay = *self.teardown_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.teardown_failures.lock().unwrap().contains(cluster.name()) {
            return Err(Error::command_failed(
                "k3d cluster delete",
                format!("scripted failure for {}", cluster.name()),
            ));
        }
        self.torn_down
            .lock()
            .unwrap()
            .push(cluster.name().to_string());
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredCluster>> {
        Ok(self.discovered.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
