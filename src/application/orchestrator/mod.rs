//! Lifecycle orchestrator.
//!
//! The façade over the record store, network allocator, registry manager
//! and hook runner. Fast operations (`activate`, the visible half of
//! `recycle`) complete synchronously under the store lock. Calls into the
//! provisioning engine happen outside every lock, either awaited by the
//! caller (`create`, `destroy`) or on tracked background tasks
//! (`spawn_create`, `spawn_destroy`, the second half of `recycle`) whose
//! outcome is reported through the [`Notifier`] port.

mod create;
mod destroy;
mod recovery;
mod recycle;


use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{random_name, Cluster, ClusterId};
use crate::error::LifecycleError;
use crate::port::{
    Event, FailedStep, KubeconfigEntry, KubeconfigMerger, Notifier, Provisioner, RegistryRuntime,
};

use super::hook::{HookRunner, HookSettings};
use super::network::{NetworkAllocator, PortPolicy};
use super::registry::{RegistryHandle, RegistryManager, RegistryStatus};
use super::store::ClusterStore;

pub use recovery::ShutdownReport;
pub use recycle::{Recycle, RecycleReport};

/// Random names tried before giving up on finding a free one.
const NAME_ATTEMPTS: usize = 32;

/// Policies the orchestrator's components run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub ports: PortPolicy,
    pub hooks: HookSettings,
    /// Prefix for generated cluster names.
    pub name_prefix: String,
}

/// External collaborators the orchestrator drives.
pub struct Collaborators {
    pub provisioner: Arc<dyn Provisioner>,
    pub registry: Arc<dyn RegistryRuntime>,
    /// `None` leaves the user's kubeconfig untouched.
    pub kubeconfig: Option<Arc<dyn KubeconfigMerger>>,
    pub notifier: Arc<dyn Notifier>,
}

/// What `create` does with the new cluster once it is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivateMode {
    /// Make it the active cluster.
    Always,
    /// Only activate it when nothing else is active.
    IfNoneActive,
}

struct Shared {
    store: ClusterStore,
    network: NetworkAllocator,
    registry: RegistryManager,
    hooks: HookRunner,
    provisioner: Arc<dyn Provisioner>,
    kubeconfig: Option<Arc<dyn KubeconfigMerger>>,
    notifier: Arc<dyn Notifier>,
    /// Registry references held by live clusters. Taking a handle out of the
    /// map is the only way to detach it.
    attachments: DashMap<ClusterId, RegistryHandle>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    recycling: AtomicBool,
    closing: AtomicBool,
    /// Latest active cluster, consumed by the kubeconfig sync worker.
    active_tx: watch::Sender<Option<ClusterId>>,
    name_prefix: String,
}

/// Cluster lifecycle orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Shared>,
}

impl Orchestrator {
    /// Build an orchestrator from its settings and collaborators.
    ///
    /// Must be called from within a tokio runtime: the kubeconfig sync
    /// worker is spawned here.
    pub fn new(settings: OrchestratorSettings, collaborators: Collaborators) -> Self {
        let OrchestratorSettings {
            ports,
            hooks,
            name_prefix,
        } = settings;
        let Collaborators {
            provisioner,
            registry,
            kubeconfig,
            notifier,
        } = collaborators;
        let (active_tx, active_rx) = watch::channel(None);

        let inner = Arc::new(Shared {
            store: ClusterStore::new(),
            network: NetworkAllocator::new(ports),
            registry: RegistryManager::new(registry, Arc::clone(&notifier)),
            hooks: HookRunner::new(hooks, Arc::clone(&notifier)),
            provisioner,
            kubeconfig,
            notifier,
            attachments: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
            recycling: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            active_tx,
            name_prefix,
        });

        if inner.kubeconfig.is_some() {
            tokio::spawn(sync_kubeconfig(Arc::downgrade(&inner), active_rx));
        }

        info!(
            provisioner = inner.provisioner.name(),
            kubeconfig = inner.kubeconfig.is_some(),
            "Orchestrator ready"
        );
        Self { inner }
    }

    /// Snapshot of every live cluster, in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Cluster> {
        self.inner.store.list()
    }

    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<Cluster> {
        self.inner.store.get(id)
    }

    /// Find a live cluster by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Cluster> {
        self.inner.store.find_by_name(name)
    }

    #[must_use]
    pub fn active(&self) -> Option<Cluster> {
        self.inner.store.active()
    }

    pub async fn registry_status(&self) -> RegistryStatus {
        self.inner.registry.status().await
    }

    /// Ports currently reserved for live or in-flight clusters.
    #[must_use]
    pub fn reserved_ports(&self) -> Vec<u16> {
        self.inner.network.reserved()
    }

    /// Make `id` the active cluster.
    ///
    /// A pure record-store transition: the previous active cluster becomes
    /// `Standby` in the same step. The kubeconfig context follows
    /// asynchronously. Activating the active cluster is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] or
    /// [`LifecycleError::NotActivatable`] for clusters that are not
    /// `Standby` or `Active`.
    pub fn activate(&self, id: ClusterId) -> Result<Cluster, LifecycleError> {
        let activation = self.inner.store.activate(id)?;
        if activation.changed {
            self.inner
                .announce_active(&activation.cluster, activation.demoted.map(|c| c.id));
        }
        Ok(activation.cluster)
    }

    /// Generate a name no live or reserved cluster uses.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateName`] if every attempt collided.
    pub fn fresh_name(&self) -> Result<String, LifecycleError> {
        let mut name = random_name(&self.inner.name_prefix);
        for _ in 1..NAME_ATTEMPTS {
            if !self.inner.store.is_name_taken(&name) {
                return Ok(name);
            }
            name = random_name(&self.inner.name_prefix);
        }
        if self.inner.store.is_name_taken(&name) {
            Err(LifecycleError::DuplicateName { name })
        } else {
            Ok(name)
        }
    }

    /// Wait for every background task and hook scheduled so far.
    pub async fn wait_idle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.inner.tasks.lock());
            if pending.is_empty() {
                break;
            }
            for task in pending {
                let _ = task.await;
            }
        }
        self.inner.hooks.wait_idle().await;
    }

    fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::Acquire)
    }

    /// Run `future` on a tracked background task.
    ///
    /// Returns false, dropping `future` unpolled, once shutdown has begun.
    fn spawn_tracked<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.inner.tasks.lock();
        if self.is_closing() {
            warn!("Shutting down, background task not started");
            return false;
        }
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(future));
        true
    }
}

impl Shared {
    /// Publish a new active cluster: event, log and kubeconfig context.
    fn announce_active(&self, cluster: &Cluster, previous: Option<ClusterId>) {
        info!(
            cluster = %cluster.name(),
            id = %cluster.id.short(),
            "Cluster activated"
        );
        self.active_tx.send_replace(Some(cluster.id));
        self.notifier.notify(Event::Activated {
            cluster: cluster.clone(),
            previous,
        });
    }

    /// Restore the single-active invariant after a cluster left `Active`.
    fn promote_successor(&self, previous: Option<ClusterId>) {
        if let Some(promoted) = self.store.promote_successor() {
            self.announce_active(&promoted, previous);
        }
    }

    /// Release a registry reference, logging instead of failing.
    async fn release_registry(&self, handle: RegistryHandle) {
        if let Err(e) = self.registry.detach(handle).await {
            warn!(error = %e, "Registry detach failed");
        }
    }

    /// Detach whatever registry reference `id` holds.
    async fn detach_cluster(&self, id: ClusterId) {
        if let Some((_, handle)) = self.attachments.remove(&id) {
            self.release_registry(handle).await;
        }
    }

    fn create_failed(&self, name: &str, step: FailedStep, error: &LifecycleError) {
        warn!(cluster = %name, step = %step, error = %error, "Cluster creation failed");
        self.notifier.notify(Event::CreateFailed {
            name: name.to_string(),
            step,
            reason: error.to_string(),
        });
    }

    async fn merge_kubeconfig(&self, entry: &KubeconfigEntry, is_active: bool) {
        let Some(merger) = &self.kubeconfig else {
            return;
        };
        if let Err(e) = merger.merge(entry, is_active).await {
            warn!(cluster = %entry.name, error = %e, "Kubeconfig merge failed");
            self.notifier.notify(Event::KubeconfigFailed {
                cluster: entry.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    async fn remove_kubeconfig(&self, entry: &KubeconfigEntry) {
        let Some(merger) = &self.kubeconfig else {
            return;
        };
        if let Err(e) = merger.remove(entry).await {
            warn!(cluster = %entry.name, error = %e, "Kubeconfig removal failed");
            self.notifier.notify(Event::KubeconfigFailed {
                cluster: entry.name.clone(),
                reason: e.to_string(),
            });
        }
    }
}

/// Point the user's kubeconfig at the active cluster, latest value wins.
async fn sync_kubeconfig(shared: Weak<Shared>, mut active_rx: watch::Receiver<Option<ClusterId>>) {
    while active_rx.changed().await.is_ok() {
        let Some(id) = *active_rx.borrow_and_update() else {
            continue;
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };
        // Skip stale values: the cluster may have been demoted or removed
        // while an earlier merge ran.
        let Some(cluster) = shared.store.get(id).filter(Cluster::is_active) else {
            continue;
        };
        let Some(entry) = KubeconfigEntry::for_cluster(&cluster) else {
            continue;
        };
        debug!(cluster = %entry.name, "Selecting kubeconfig context");
        shared.merge_kubeconfig(&entry, true).await;
    }
}
