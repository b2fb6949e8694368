//! Recycle: swap in a standby and replace the retired active cluster.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{info, warn};

use super::{ActivateMode, Orchestrator, Shared};
use crate::application::store::Transition;
use crate::domain::Cluster;
use crate::error::LifecycleError;

/// Held for as long as a recycle runs, including its background half.
struct RecycleGuard {
    shared: Arc<Shared>,
}

impl RecycleGuard {
    fn acquire(shared: &Arc<Shared>) -> Result<Self, LifecycleError> {
        shared
            .recycling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LifecycleError::RecycleInProgress)?;
        Ok(Self {
            shared: Arc::clone(shared),
        })
    }
}

impl Drop for RecycleGuard {
    fn drop(&mut self) {
        self.shared.recycling.store(false, Ordering::Release);
    }
}

/// Outcome of the background half of a recycle.
#[derive(Debug, Clone)]
pub struct RecycleReport {
    /// Name of the cluster that was retired.
    pub retired: String,
    /// Result of destroying the retired cluster.
    pub destroyed: Result<(), LifecycleError>,
    /// The replacement cluster, or why it could not be created.
    pub replacement: Result<Cluster, LifecycleError>,
}

/// A recycle whose visible swap has completed.
#[derive(Debug)]
pub struct Recycle {
    /// The standby that is now active.
    pub activated: Cluster,
    /// The previously active cluster, as it was when the swap happened.
    pub retired: Cluster,
    done: oneshot::Receiver<RecycleReport>,
}

impl Recycle {
    /// Wait for the retired cluster's destruction and replacement.
    ///
    /// Returns `None` if the background task was abandoned at shutdown.
    pub async fn wait(self) -> Option<RecycleReport> {
        self.done.await.ok()
    }
}

impl Orchestrator {
    /// Replace the active cluster.
    ///
    /// The most recently created standby becomes active before this
    /// returns. The retired cluster is then destroyed in the background and
    /// a replacement is created from its spec under a fresh name; its
    /// registry reference passes straight to the replacement, so the
    /// registry is neither stopped nor restarted. The replacement stays on
    /// standby unless nothing is active by the time it is ready.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ShuttingDown`] once [`shutdown`](Self::shutdown)
    ///   has begun; nothing is swapped.
    /// - [`LifecycleError::RecycleInProgress`] while a previous recycle's
    ///   background work is still running.
    /// - [`LifecycleError::PoolEmpty`] when no cluster is active.
    /// - [`LifecycleError::NoStandbyAvailable`] when there is nothing to
    ///   swap in; the active cluster is left untouched.
    pub fn recycle(&self) -> Result<Recycle, LifecycleError> {
        if self.is_closing() {
            return Err(LifecycleError::ShuttingDown);
        }
        let guard = RecycleGuard::acquire(&self.inner)?;
        let store = &self.inner.store;

        let retired = store.active().ok_or(LifecycleError::PoolEmpty)?;
        let standby = store
            .latest_standby()
            .ok_or(LifecycleError::NoStandbyAvailable)?;
        let activated = self.activate(standby.id)?;

        info!(
            activated = %activated.name(),
            retired = %retired.name(),
            "Recycling active cluster"
        );

        // Leaves `Standby` before returning, so it is never swapped back in.
        let destroying = self.begin_destroy(retired.id);

        let (tx, done) = oneshot::channel();
        let this = self.clone();
        let retiring = retired.clone();
        let rollback = destroying.as_ref().ok().map(|(cluster, _)| cluster.id);
        let started = self.spawn_tracked(async move {
            let report = this.replace(retiring, destroying).await;
            drop(guard);
            let _ = tx.send(report);
        });
        if !started {
            // Shutdown began after the swap: the retired cluster goes back to
            // standby instead of waiting in `Destroying` for a task that never runs.
            if let Some(id) = rollback {
                if let Err(e) = self.inner.store.apply(Transition::TeardownFail { id }) {
                    warn!(cluster = %retired.name(), error = %e, "Retired record already reconciled");
                }
            }
            return Err(LifecycleError::ShuttingDown);
        }

        Ok(Recycle {
            activated,
            retired,
            done,
        })
    }

    async fn replace(
        &self,
        retired: Cluster,
        destroying: Result<(Cluster, bool), LifecycleError>,
    ) -> RecycleReport {
        let teardown = match destroying {
            Ok((cluster, was_active)) => self.finish_destroy(cluster, was_active, true).await,
            Err(e) => Err(e),
        };
        let (destroyed, handoff) = match teardown {
            Ok(handle) => (Ok(()), handle),
            Err(e) => (Err(e), None),
        };
        if let Err(e) = &destroyed {
            warn!(cluster = %retired.name(), error = %e, "Recycled cluster was not destroyed");
        }

        let replacement = match self.fresh_name() {
            Ok(name) => {
                self.create_cluster(retired.spec.renamed(name), handoff, ActivateMode::IfNoneActive)
                    .await
            }
            Err(e) => {
                if let Some(handle) = handoff {
                    self.inner.release_registry(handle).await;
                }
                Err(e)
            }
        };
        match &replacement {
            Ok(cluster) => info!(
                retired = %retired.name(),
                replacement = %cluster.name(),
                "Recycle complete"
            ),
            Err(e) => warn!(retired = %retired.name(), error = %e, "Replacement cluster not created"),
        }

        RecycleReport {
            retired: retired.spec.name.clone(),
            destroyed,
            replacement,
        }
    }
}
