//! Notifier port for lifecycle events.
//!
//! Background work (provisioning, teardown, recycle replenishment) has no
//! caller to return errors to, so its outcome is reported through this port.
//! Synchronous calls report the same events in addition to their return value.

use std::fmt;

use crate::domain::{Cluster, ClusterId, ClusterState, HookAction, RegistryConfig};

/// The step of a lifecycle operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    /// Reserving the shared registry.
    Registry,
    /// The provisioning engine's create call.
    Provision,
    /// The provisioning engine's teardown call.
    Teardown,
    /// Merging or selecting the kubeconfig.
    Kubeconfig,
    /// Reserving a name or port before anything was created.
    Reservation,
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registry => "registry",
            Self::Provision => "provision",
            Self::Teardown => "teardown",
            Self::Kubeconfig => "kubeconfig",
            Self::Reservation => "reservation",
        })
    }
}

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A cluster record was created and provisioning started.
    Creating { cluster: Cluster },
    /// Provisioning finished; the cluster is ready.
    Created { cluster: Cluster },
    /// Creation failed and was rolled back.
    CreateFailed {
        name: String,
        step: FailedStep,
        reason: String,
    },
    /// Teardown started.
    Destroying { cluster: Cluster },
    /// Teardown finished and the cluster left the pool.
    Destroyed { cluster: Cluster },
    /// Teardown failed; the cluster was rolled back to `restored`.
    DestroyFailed {
        name: String,
        restored: ClusterState,
        reason: String,
    },
    /// The active cluster changed.
    Activated {
        cluster: Cluster,
        previous: Option<ClusterId>,
    },
    /// The shared registry was started for its first user.
    RegistryStarted { config: RegistryConfig },
    /// The shared registry was removed after its last user left.
    RegistryStopped { config: RegistryConfig },
    /// A hook script failed, timed out or was missing. Never fatal.
    HookFailed {
        action: HookAction,
        cluster: String,
        reason: String,
    },
    /// The user's kubeconfig could not be updated.
    KubeconfigFailed { cluster: String, reason: String },
    /// A background task was abandoned at shutdown and its record
    /// reconciled from `state`.
    Incomplete { cluster: String, state: ClusterState },
}

impl Event {
    /// Name of the cluster the event is about, when there is one.
    #[must_use]
    pub fn cluster_name(&self) -> Option<&str> {
        match self {
            Self::Creating { cluster }
            | Self::Created { cluster }
            | Self::Destroying { cluster }
            | Self::Destroyed { cluster }
            | Self::Activated { cluster, .. } => Some(cluster.name()),
            Self::CreateFailed { name, .. } | Self::DestroyFailed { name, .. } => Some(name),
            Self::HookFailed { cluster, .. }
            | Self::KubeconfigFailed { cluster, .. }
            | Self::Incomplete { cluster, .. } => Some(cluster),
            Self::RegistryStarted { .. } | Self::RegistryStopped { .. } => None,
        }
    }

    /// True for events reporting something that went wrong.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed { .. }
                | Self::DestroyFailed { .. }
                | Self::HookFailed { .. }
                | Self::KubeconfigFailed { .. }
                | Self::Incomplete { .. }
        )
    }
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the orchestrator.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `notify` is called from inside lifecycle operations and must not block
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifierRegistry {
    fn notify(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }
}

/// A no-op notifier for when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::domain::ClusterSpec;

    struct Counting(Arc<Mutex<usize>>);

    impl Notifier for Counting {
        fn notify(&self, _event: Event) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn registry_fans_out_to_every_notifier() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(NullNotifier));
        assert_eq!(registry.len(), 3);

        registry.notify(Event::RegistryStopped {
            config: RegistryConfig::new(crate::domain::RegistryMode::ReadWrite, "r", 5000),
        });
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn events_name_their_cluster() {
        let cluster = Cluster::provisioning(ClusterSpec::new("c1"), 6500, false);
        assert_eq!(
            Event::Creating { cluster }.cluster_name(),
            Some("c1")
        );
        let failed = Event::CreateFailed {
            name: "c2".into(),
            step: FailedStep::Provision,
            reason: "boom".into(),
        };
        assert_eq!(failed.cluster_name(), Some("c2"));
        assert!(failed.is_failure());
    }
}
