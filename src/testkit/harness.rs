//! An orchestrator wired to recording fakes.

use std::sync::Arc;

use crate::application::orchestrator::{Collaborators, Orchestrator};
use crate::infrastructure::config::settings::Config;

use super::kubeconfig::RecordingMerger;
use super::notifier::RecordingNotifier;
use super::provisioner::ScriptedProvisioner;
use super::registry::RecordingRegistryRuntime;

/// Orchestrator plus handles on every fake behind it.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub provisioner: Arc<ScriptedProvisioner>,
    pub registry: Arc<RecordingRegistryRuntime>,
    pub kubeconfig: Arc<RecordingMerger>,
    pub notifier: RecordingNotifier,
}

impl Harness {
    /// Harness over [`config()`](super::config::config). Needs a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(&super::config::config())
    }

    pub fn with_config(config: &Config) -> Self {
        let provisioner = Arc::new(ScriptedProvisioner::new());
        let registry = Arc::new(RecordingRegistryRuntime::new());
        let kubeconfig = Arc::new(RecordingMerger::new());
        let notifier = RecordingNotifier::new();

        let orchestrator = Orchestrator::new(
            config.orchestrator_settings(),
            Collaborators {
                provisioner: provisioner.clone(),
                registry: registry.clone(),
                kubeconfig: Some(kubeconfig.clone()),
                notifier: Arc::new(notifier.clone()),
            },
        );

        Self {
            orchestrator,
            provisioner,
            registry,
            kubeconfig,
            notifier,
        }
    }

    /// Number of clusters currently `Active`.
    pub fn active_count(&self) -> usize {
        self.orchestrator
            .list()
            .iter()
            .filter(|c| c.is_active())
            .count()
    }

    /// `(name, state)` of every live cluster, in creation order.
    pub fn states(&self) -> Vec<(String, String)> {
        self.orchestrator
            .list()
            .into_iter()
            .map(|c| (c.spec.name.clone(), c.state.to_string()))
            .collect()
    }
}
