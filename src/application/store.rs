//! Cluster record store.
//!
//! The in-memory table of clusters and the single place their state changes.
//! Every mutation is a [`Transition`] validated against the lifecycle state
//! machine and committed under one write lock, so readers only ever see
//! snapshots taken between transitions.
//!
//! ```text
//! (none) --create--> Provisioning --provision_ok--> Standby
//! Provisioning --provision_fail--> (removed)
//! Standby --activate--> Active   (the previous Active is demoted to Standby)
//! Standby|Active --destroy--> Destroying --teardown_ok--> (removed)
//! Destroying --teardown_fail--> Standby|Active
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{Cluster, ClusterId, ClusterState};
use crate::error::LifecycleError;

/// A state change requested of the store.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Insert a new record in `Provisioning`.
    Create(Cluster),
    /// Insert a record found already running, directly in `Standby`.
    Adopt(Cluster),
    /// Provisioning finished.
    ProvisionOk {
        id: ClusterId,
        master_ip: String,
        kubeconfig_path: PathBuf,
    },
    /// Provisioning failed; the record and its name are dropped.
    ProvisionFail { id: ClusterId },
    /// Make the cluster the active one, demoting the current active.
    Activate { id: ClusterId },
    /// Teardown started.
    Destroy { id: ClusterId },
    /// Teardown finished; the record and its name are dropped.
    TeardownOk { id: ClusterId },
    /// Teardown failed; the record goes back to where it was.
    TeardownFail { id: ClusterId },
}

impl Transition {
    /// Short name used in errors and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Adopt(_) => "adopt",
            Self::ProvisionOk { .. } => "provision_ok",
            Self::ProvisionFail { .. } => "provision_fail",
            Self::Activate { .. } => "activate",
            Self::Destroy { .. } => "destroy",
            Self::TeardownOk { .. } => "teardown_ok",
            Self::TeardownFail { .. } => "teardown_fail",
        }
    }
}

/// Result of an activation.
#[derive(Debug, Clone)]
pub struct Activation {
    /// The now active cluster.
    pub cluster: Cluster,
    /// The cluster that was active before, now `Standby`.
    pub demoted: Option<Cluster>,
    /// False when the cluster was already active.
    pub changed: bool,
}

#[derive(Debug)]
struct Record {
    cluster: Cluster,
    /// State restored if the pending teardown fails.
    rollback_to: Option<ClusterState>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Live records in creation order.
    records: Vec<Record>,
    /// Names of live records plus names reserved for in-flight creates.
    names: HashSet<String>,
}

impl Inner {
    fn position(&self, id: ClusterId) -> Result<usize, LifecycleError> {
        self.records
            .iter()
            .position(|r| r.cluster.id == id)
            .ok_or(LifecycleError::NotFound { id })
    }

    fn active_position(&self) -> Option<usize> {
        self.records.iter().position(|r| r.cluster.is_active())
    }

    fn latest_standby_position(&self) -> Option<usize> {
        self.records
            .iter()
            .rposition(|r| r.cluster.state == ClusterState::Standby)
    }

    fn insert(&mut self, cluster: Cluster) -> Result<Cluster, LifecycleError> {
        if self.records.iter().any(|r| r.cluster.name() == cluster.name()) {
            return Err(LifecycleError::DuplicateName {
                name: cluster.spec.name,
            });
        }
        if self.records.iter().any(|r| r.cluster.api_port == cluster.api_port) {
            return Err(LifecycleError::PortUnavailable {
                port: cluster.api_port,
            });
        }
        self.names.insert(cluster.spec.name.clone());
        self.records.push(Record {
            cluster: cluster.clone(),
            rollback_to: None,
        });
        Ok(cluster)
    }

    fn remove(&mut self, index: usize) -> Cluster {
        let mut cluster = self.records.remove(index).cluster;
        self.names.remove(cluster.name());
        cluster.state = ClusterState::Destroyed;
        cluster
    }

    fn invalid(&self, index: usize, transition: &Transition) -> LifecycleError {
        let cluster = &self.records[index].cluster;
        LifecycleError::InvalidTransition {
            id: cluster.id,
            from: cluster.state,
            transition: transition.label(),
        }
    }

    fn activate(&mut self, id: ClusterId) -> Result<Activation, LifecycleError> {
        let index = self.position(id)?;
        let state = self.records[index].cluster.state;
        match state {
            ClusterState::Active => Ok(Activation {
                cluster: self.records[index].cluster.clone(),
                demoted: None,
                changed: false,
            }),
            ClusterState::Standby => {
                let demoted = self.active_position().map(|previous| {
                    let record = &mut self.records[previous];
                    record.cluster.state = ClusterState::Standby;
                    record.cluster.clone()
                });
                let record = &mut self.records[index];
                record.cluster.state = ClusterState::Active;
                Ok(Activation {
                    cluster: record.cluster.clone(),
                    demoted,
                    changed: true,
                })
            }
            _ => Err(LifecycleError::NotActivatable { id, state }),
        }
    }

    fn apply(&mut self, transition: Transition) -> Result<Cluster, LifecycleError> {
        match transition {
            Transition::Create(mut cluster) => {
                cluster.state = ClusterState::Provisioning;
                self.insert(cluster)
            }
            Transition::Adopt(mut cluster) => {
                if self.names.contains(cluster.name()) {
                    return Err(LifecycleError::DuplicateName {
                        name: cluster.spec.name,
                    });
                }
                cluster.state = ClusterState::Standby;
                self.insert(cluster)
            }
            Transition::ProvisionOk {
                id,
                ref master_ip,
                ref kubeconfig_path,
            } => {
                let index = self.position(id)?;
                if self.records[index].cluster.state != ClusterState::Provisioning {
                    return Err(self.invalid(index, &transition));
                }
                let cluster = &mut self.records[index].cluster;
                cluster.state = ClusterState::Standby;
                cluster.master_ip = Some(master_ip.clone());
                cluster.kubeconfig_path = Some(kubeconfig_path.clone());
                Ok(cluster.clone())
            }
            Transition::ProvisionFail { id } => {
                let index = self.position(id)?;
                if self.records[index].cluster.state != ClusterState::Provisioning {
                    return Err(self.invalid(index, &transition));
                }
                Ok(self.remove(index))
            }
            Transition::Activate { id } => self.activate(id).map(|a| a.cluster),
            Transition::Destroy { id } => {
                let index = self.position(id)?;
                let state = self.records[index].cluster.state;
                if !state.is_ready() {
                    return Err(self.invalid(index, &transition));
                }
                let record = &mut self.records[index];
                record.rollback_to = Some(state);
                record.cluster.state = ClusterState::Destroying;
                Ok(record.cluster.clone())
            }
            Transition::TeardownOk { id } => {
                let index = self.position(id)?;
                if self.records[index].cluster.state != ClusterState::Destroying {
                    return Err(self.invalid(index, &transition));
                }
                Ok(self.remove(index))
            }
            Transition::TeardownFail { id } => {
                let index = self.position(id)?;
                if self.records[index].cluster.state != ClusterState::Destroying {
                    return Err(self.invalid(index, &transition));
                }
                let another_active = self.active_position().is_some();
                let record = &mut self.records[index];
                let restored = match record.rollback_to.take() {
                    // Someone else took over while the teardown ran.
                    Some(ClusterState::Active) if another_active => ClusterState::Standby,
                    Some(state) => state,
                    None => ClusterState::Standby,
                };
                record.cluster.state = restored;
                Ok(record.cluster.clone())
            }
        }
    }
}

/// Single source of truth for cluster records.
///
/// The currently active cluster is not stored separately; it is whichever
/// record is in `Active`.
#[derive(Debug, Default)]
pub struct ClusterStore {
    inner: RwLock<Inner>,
}

impl ClusterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one cluster.
    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<Cluster> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.cluster.id == id)
            .map(|r| r.cluster.clone())
    }

    /// Snapshot of the live cluster called `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Cluster> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.cluster.name() == name)
            .map(|r| r.cluster.clone())
    }

    /// Snapshot of every live cluster, in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Cluster> {
        self.inner
            .read()
            .records
            .iter()
            .map(|r| r.cluster.clone())
            .collect()
    }

    /// The active cluster, if any.
    #[must_use]
    pub fn active(&self) -> Option<Cluster> {
        let inner = self.inner.read();
        inner
            .active_position()
            .map(|i| inner.records[i].cluster.clone())
    }

    /// The most recently created standby cluster.
    #[must_use]
    pub fn latest_standby(&self) -> Option<Cluster> {
        let inner = self.inner.read();
        inner
            .latest_standby_position()
            .map(|i| inner.records[i].cluster.clone())
    }

    /// Clusters caught mid-transition (`Provisioning` or `Destroying`).
    #[must_use]
    pub fn transient(&self) -> Vec<Cluster> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.cluster.state.is_transient())
            .map(|r| r.cluster.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// True when `name` is live or reserved.
    #[must_use]
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.inner.read().names.contains(name)
    }

    /// Reserve `name` for a cluster about to be created.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateName`] when the name is live or
    /// already reserved.
    pub fn reserve_name(&self, name: &str) -> Result<(), LifecycleError> {
        if self.inner.write().names.insert(name.to_string()) {
            Ok(())
        } else {
            Err(LifecycleError::DuplicateName {
                name: name.to_string(),
            })
        }
    }

    /// Drop a reservation that never became a record. Live names are kept.
    pub fn release_name(&self, name: &str) {
        let mut inner = self.inner.write();
        if !inner.records.iter().any(|r| r.cluster.name() == name) {
            inner.names.remove(name);
        }
    }

    /// Validate and commit a transition.
    ///
    /// Returns the cluster as it is after the transition. For transitions
    /// that remove the record the snapshot is in `Destroyed`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown ids and
    /// [`LifecycleError::InvalidTransition`] when the state machine does not
    /// allow the transition from the current state.
    pub fn apply(&self, transition: Transition) -> Result<Cluster, LifecycleError> {
        let label = transition.label();
        let cluster = self.inner.write().apply(transition)?;
        debug!(
            cluster = %cluster.name(),
            id = %cluster.id.short(),
            transition = label,
            state = %cluster.state,
            "Applied transition"
        );
        Ok(cluster)
    }

    /// Make `id` the active cluster in one step, demoting the current one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] or
    /// [`LifecycleError::NotActivatable`] when the cluster is not `Standby`
    /// or `Active`.
    pub fn activate(&self, id: ClusterId) -> Result<Activation, LifecycleError> {
        self.inner.write().activate(id)
    }

    /// Activate the most recently created standby if nothing is active.
    ///
    /// Returns the promoted cluster.
    pub fn promote_successor(&self) -> Option<Cluster> {
        let mut inner = self.inner.write();
        if inner.active_position().is_some() {
            return None;
        }
        let index = inner.latest_standby_position()?;
        let record = &mut inner.records[index];
        record.cluster.state = ClusterState::Active;
        Some(record.cluster.clone())
    }
}
