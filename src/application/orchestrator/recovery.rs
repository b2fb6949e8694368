//! Startup recovery and graceful shutdown.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::{info, warn};

use super::Orchestrator;
use crate::application::store::Transition;
use crate::domain::{Cluster, ClusterSpec, ClusterState};
use crate::error::Result;
use crate::port::Event;

/// Records that had to be reconciled at shutdown.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// Background tasks that settled within the grace period.
    pub completed: usize,
    /// Clusters whose background operation was abandoned.
    pub abandoned: Vec<Cluster>,
}

impl Orchestrator {
    /// Adopt clusters the provisioning engine is already running.
    ///
    /// Discovered clusters enter the pool as `Standby` without a registry
    /// reference. Clusters whose name or port is already in use are skipped.
    /// When nothing is active afterwards, the most recently adopted cluster
    /// is activated.
    ///
    /// # Errors
    ///
    /// Returns the provisioner's error when discovery itself fails.
    pub async fn recover(&self) -> Result<Vec<Cluster>> {
        let shared = &self.inner;
        let discovered = shared.provisioner.discover().await?;
        let mut adopted = Vec::with_capacity(discovered.len());

        for found in discovered {
            if let Err(e) = shared.network.claim(found.api_port) {
                warn!(cluster = %found.name, error = %e, "Not adopting cluster");
                continue;
            }
            let mut spec = ClusterSpec::new(found.name.clone()).with_workers(found.workers);
            spec.api_port = found.api_port;
            let mut cluster = Cluster::provisioning(spec, found.api_port, false);
            cluster.master_ip = found.master_ip;
            cluster.kubeconfig_path = found.kubeconfig_path;

            match shared.store.apply(Transition::Adopt(cluster)) {
                Ok(cluster) => {
                    info!(cluster = %cluster.name(), port = cluster.api_port, "Adopted running cluster");
                    adopted.push(cluster);
                }
                Err(e) => {
                    shared.network.release(found.api_port);
                    warn!(cluster = %found.name, error = %e, "Not adopting cluster");
                }
            }
        }

        shared.promote_successor(None);
        Ok(adopted)
    }

    /// Stop accepting background work and settle what is in flight.
    ///
    /// Background tasks get `grace` to finish. Tasks still running after
    /// that are aborted and their records reconciled: provisioning clusters
    /// are dropped with their port and registry reference released, and
    /// clusters being destroyed are rolled back. Each is reported as
    /// [`Event::Incomplete`].
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        let shared = &self.inner;
        shared.closing.store(true, Ordering::Release);

        let mut tasks = std::mem::take(&mut *shared.tasks.lock());
        let mut awaited = 0usize;
        let settled = tokio::time::timeout(grace, async {
            for task in &mut tasks {
                let _ = task.await;
                awaited += 1;
            }
        })
        .await
        .is_ok();

        let mut report = ShutdownReport {
            completed: awaited,
            abandoned: Vec::new(),
        };
        if !settled {
            let running: Vec<_> = tasks.into_iter().skip(awaited).collect();
            warn!(running = running.len(), "Aborting background tasks after grace period");
            for task in &running {
                task.abort();
            }
            for task in running {
                let _ = task.await;
            }
        }

        for cluster in shared.store.transient() {
            let transition = match cluster.state {
                ClusterState::Provisioning => Transition::ProvisionFail { id: cluster.id },
                _ => Transition::TeardownFail { id: cluster.id },
            };
            if let Err(e) = shared.store.apply(transition) {
                warn!(cluster = %cluster.name(), error = %e, "Could not reconcile record");
                continue;
            }
            if cluster.state == ClusterState::Provisioning {
                shared.network.release(cluster.api_port);
                shared.detach_cluster(cluster.id).await;
            }
            warn!(cluster = %cluster.name(), state = %cluster.state, "Background operation incomplete");
            shared.notifier.notify(Event::Incomplete {
                cluster: cluster.spec.name.clone(),
                state: cluster.state,
            });
            report.abandoned.push(cluster);
        }
        shared.promote_successor(None);

        if tokio::time::timeout(grace, shared.hooks.wait_idle())
            .await
            .is_err()
        {
            warn!("Hooks still running at shutdown");
        }

        info!(
            completed = report.completed,
            abandoned = report.abandoned.len(),
            "Orchestrator shut down"
        );
        report
    }
}
