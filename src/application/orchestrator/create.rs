//! Cluster creation.

use tracing::{info, warn};

use super::{ActivateMode, Orchestrator};
use crate::application::registry::RegistryHandle;
use crate::application::store::Transition;
use crate::domain::{Cluster, ClusterSpec, HookAction};
use crate::error::LifecycleError;
use crate::port::{Event, FailedStep, KubeconfigEntry, ProvisionRequest};

impl Orchestrator {
    /// Create a cluster and make it the active one.
    ///
    /// Reserves the name, a port and (when the spec asks for one) a registry
    /// reference, provisions the cluster, merges its kubeconfig, fires the
    /// `create` hook and activates it. Any failure rolls every reservation
    /// back, so a failed create leaves no trace in the pool.
    ///
    /// # Errors
    ///
    /// `InvalidSpec` and `DuplicateName` for bad requests,
    /// `PortUnavailable`/`NoPortsAvailable` when no port can be reserved,
    /// `RegistryConfigConflict`/`RegistryUnavailable` for the shared
    /// registry, and `ProvisioningFailed` when the engine fails.
    pub async fn create(&self, spec: ClusterSpec) -> Result<Cluster, LifecycleError> {
        self.create_cluster(spec, None, ActivateMode::Always).await
    }

    /// Create a cluster without taking over from the active one.
    ///
    /// It is activated only when the pool has no active cluster.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub async fn create_standby(&self, spec: ClusterSpec) -> Result<Cluster, LifecycleError> {
        self.create_cluster(spec, None, ActivateMode::IfNoneActive)
            .await
    }

    /// Create a cluster on a background task.
    ///
    /// The outcome is reported as [`Event::Created`] or
    /// [`Event::CreateFailed`].
    pub fn spawn_create(&self, spec: ClusterSpec) {
        let this = self.clone();
        self.spawn_tracked(async move {
            let _ = this.create(spec).await;
        });
    }

    /// [`create_standby`](Self::create_standby) on a background task.
    pub fn spawn_create_standby(&self, spec: ClusterSpec) {
        let this = self.clone();
        self.spawn_tracked(async move {
            let _ = this.create_standby(spec).await;
        });
    }

    /// Shared create path.
    ///
    /// `handoff` is a registry reference inherited from a retired cluster;
    /// it is used instead of a fresh attach when compatible with the spec,
    /// and released on every path that does not use it.
    pub(super) async fn create_cluster(
        &self,
        spec: ClusterSpec,
        handoff: Option<RegistryHandle>,
        mode: ActivateMode,
    ) -> Result<Cluster, LifecycleError> {
        let shared = &self.inner;

        if let Err(reason) = spec.validate() {
            if let Some(handle) = handoff {
                shared.release_registry(handle).await;
            }
            return Err(LifecycleError::InvalidSpec { reason });
        }

        if let Err(e) = shared.store.reserve_name(&spec.name) {
            if let Some(handle) = handoff {
                shared.release_registry(handle).await;
            }
            return Err(e);
        }

        let port = match shared.network.reserve(spec.api_port) {
            Ok(port) => port,
            Err(e) => {
                shared.store.release_name(&spec.name);
                if let Some(handle) = handoff {
                    shared.release_registry(handle).await;
                }
                shared.create_failed(&spec.name, FailedStep::Reservation, &e);
                return Err(e);
            }
        };

        let handle = match &spec.registry {
            None => {
                if let Some(handle) = handoff {
                    shared.release_registry(handle).await;
                }
                None
            }
            Some(requested) => {
                let inherited = match handoff {
                    Some(handle) if handle.config().is_compatible_with(requested) => Some(handle),
                    Some(handle) => {
                        shared.release_registry(handle).await;
                        None
                    }
                    None => None,
                };
                match inherited {
                    Some(handle) => Some(handle),
                    None => match shared.registry.attach(requested).await {
                        Ok(handle) => Some(handle),
                        Err(e) => {
                            shared.network.release(port);
                            shared.store.release_name(&spec.name);
                            shared.create_failed(&spec.name, FailedStep::Registry, &e);
                            return Err(e);
                        }
                    },
                }
            }
        };

        let name = spec.name.clone();
        let cluster = match shared.store.apply(Transition::Create(Cluster::provisioning(
            spec,
            port,
            handle.is_some(),
        ))) {
            Ok(cluster) => cluster,
            Err(e) => {
                if let Some(handle) = handle {
                    shared.release_registry(handle).await;
                }
                shared.network.release(port);
                shared.store.release_name(&name);
                shared.create_failed(&name, FailedStep::Reservation, &e);
                return Err(e);
            }
        };
        if let Some(handle) = handle {
            shared.attachments.insert(cluster.id, handle);
        }

        info!(
            cluster = %cluster.name(),
            id = %cluster.id.short(),
            port,
            workers = cluster.worker_count(),
            registry = cluster.registry_attached,
            "Provisioning cluster"
        );
        shared.notifier.notify(Event::Creating {
            cluster: cluster.clone(),
        });

        let request = ProvisionRequest::for_cluster(&cluster);
        let provisioned = match shared.provisioner.provision(&request).await {
            Ok(provisioned) => provisioned,
            Err(e) => {
                let error = LifecycleError::ProvisioningFailed {
                    name: cluster.spec.name.clone(),
                    reason: e.to_string(),
                };
                if let Err(e) = shared.store.apply(Transition::ProvisionFail { id: cluster.id }) {
                    warn!(cluster = %cluster.name(), error = %e, "Failed record already reconciled");
                }
                shared.network.release(port);
                shared.detach_cluster(cluster.id).await;
                shared.hooks.run(HookAction::Create, cluster.clone(), false);
                shared.create_failed(cluster.name(), FailedStep::Provision, &error);
                return Err(error);
            }
        };

        let entry = KubeconfigEntry {
            id: cluster.id,
            name: cluster.spec.name.clone(),
            path: provisioned.kubeconfig_path.clone(),
        };
        shared.merge_kubeconfig(&entry, false).await;

        let ready = shared.store.apply(Transition::ProvisionOk {
            id: cluster.id,
            master_ip: provisioned.master_ip,
            kubeconfig_path: provisioned.kubeconfig_path,
        });
        let ready = match ready {
            Ok(ready) => ready,
            Err(e) => {
                // Abandoned at shutdown and reconciled while provisioning ran.
                shared.create_failed(cluster.name(), FailedStep::Provision, &e);
                return Err(e);
            }
        };
        shared.hooks.run(HookAction::Create, ready.clone(), true);

        let should_activate = match mode {
            ActivateMode::Always => true,
            ActivateMode::IfNoneActive => shared.store.active().is_none(),
        };
        let cluster = if should_activate {
            match self.activate(ready.id) {
                Ok(active) => active,
                Err(e) => {
                    warn!(cluster = %ready.name(), error = %e, "New cluster could not be activated");
                    shared.store.get(ready.id).unwrap_or(ready)
                }
            }
        } else {
            ready
        };

        info!(
            cluster = %cluster.name(),
            state = %cluster.state,
            "Cluster created"
        );
        shared.notifier.notify(Event::Created {
            cluster: cluster.clone(),
        });
        Ok(cluster)
    }
}
