//! Cluster destruction.

use tracing::{info, warn};

use super::Orchestrator;
use crate::application::registry::RegistryHandle;
use crate::application::store::Transition;
use crate::domain::{Cluster, ClusterId, HookAction};
use crate::error::LifecycleError;
use crate::port::{Event, KubeconfigEntry};

impl Orchestrator {
    /// Tear a cluster down and remove it from the pool.
    ///
    /// On success the cluster's registry reference and port are released,
    /// its kubeconfig entry removed and the `destroy` hook fired. If it was
    /// the active cluster, the most recently created standby takes over.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] for unknown ids.
    /// - [`LifecycleError::InvalidTransition`] while the cluster is still
    ///   provisioning or already being destroyed.
    /// - [`LifecycleError::TeardownFailed`] when the engine fails; the
    ///   cluster is then rolled back with its resources still attached.
    pub async fn destroy(&self, id: ClusterId) -> Result<(), LifecycleError> {
        let (cluster, was_active) = self.begin_destroy(id)?;
        self.finish_destroy(cluster, was_active, false)
            .await
            .map(|_| ())
    }

    /// Destroy a cluster on a background task.
    ///
    /// The outcome is reported as [`Event::Destroyed`] or
    /// [`Event::DestroyFailed`].
    pub fn spawn_destroy(&self, id: ClusterId) {
        let this = self.clone();
        self.spawn_tracked(async move {
            let _ = this.destroy(id).await;
        });
    }

    /// Move a cluster to `Destroying`.
    ///
    /// Returns the snapshot to hand to [`finish_destroy`](Self::finish_destroy)
    /// and whether the cluster was active.
    pub(super) fn begin_destroy(&self, id: ClusterId) -> Result<(Cluster, bool), LifecycleError> {
        let shared = &self.inner;
        let was_active = shared.store.get(id).is_some_and(|c| c.is_active());
        let cluster = shared.store.apply(Transition::Destroy { id })?;
        info!(
            cluster = %cluster.name(),
            id = %cluster.id.short(),
            "Destroying cluster"
        );
        shared.notifier.notify(Event::Destroying {
            cluster: cluster.clone(),
        });
        Ok((cluster, was_active))
    }

    /// Tear down a cluster in `Destroying` and settle its record.
    ///
    /// With `keep_registry` the cluster's registry reference is returned
    /// instead of detached, so a replacement can take it over.
    pub(super) async fn finish_destroy(
        &self,
        cluster: Cluster,
        was_active: bool,
        keep_registry: bool,
    ) -> Result<Option<RegistryHandle>, LifecycleError> {
        let shared = &self.inner;
        let id = cluster.id;

        if let Err(e) = shared.provisioner.teardown(&cluster).await {
            let error = LifecycleError::TeardownFailed {
                name: cluster.spec.name.clone(),
                reason: e.to_string(),
            };
            let restored = match shared.store.apply(Transition::TeardownFail { id }) {
                Ok(restored) => restored.state,
                Err(e) => {
                    warn!(cluster = %cluster.name(), error = %e, "Failed record already reconciled");
                    cluster.state
                }
            };
            warn!(
                cluster = %cluster.name(),
                restored = %restored,
                error = %error,
                "Cluster teardown failed"
            );
            shared.notifier.notify(Event::DestroyFailed {
                name: cluster.spec.name.clone(),
                restored,
                reason: error.to_string(),
            });
            shared.promote_successor(None);
            return Err(error);
        }

        let removed = match shared.store.apply(Transition::TeardownOk { id }) {
            Ok(removed) => removed,
            Err(e) => {
                // Shutdown rolled the record back while teardown ran. The
                // cluster is gone but its record is live until `recover`.
                let state = shared.store.get(id).map_or(cluster.state, |c| c.state);
                warn!(cluster = %cluster.name(), state = %state, error = %e, "Destroyed record already reconciled");
                shared.notifier.notify(Event::Incomplete {
                    cluster: cluster.spec.name.clone(),
                    state,
                });
                return Err(e);
            }
        };
        shared.network.release(removed.api_port);

        let handle = shared.attachments.remove(&id).map(|(_, handle)| handle);
        let handle = match handle {
            Some(handle) if !keep_registry => {
                shared.release_registry(handle).await;
                None
            }
            other => other,
        };

        if let Some(entry) = KubeconfigEntry::for_cluster(&removed) {
            shared.remove_kubeconfig(&entry).await;
        }
        shared.hooks.run(HookAction::Destroy, removed.clone(), true);

        info!(cluster = %removed.name(), "Cluster destroyed");
        shared.notifier.notify(Event::Destroyed {
            cluster: removed,
        });
        shared.promote_successor(was_active.then_some(id));

        Ok(handle)
    }
}
