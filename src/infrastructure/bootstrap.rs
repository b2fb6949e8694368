//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::docker::DockerRegistryRuntime;
use crate::adapter::outbound::k3d::K3dProvisioner;
use crate::adapter::outbound::kubectl::KubectlMerger;
use crate::adapter::outbound::notifier::{ChannelNotifier, LogNotifier};
use crate::application::orchestrator::{Collaborators, Orchestrator};
use crate::infrastructure::config::settings::Config;
use crate::port::{KubeconfigMerger, NotifierRegistry};

/// Build the notifier registry: the log, plus `events` when a caller wants
/// to follow lifecycle events in-process.
pub(crate) fn build_notifier_registry(events: Option<&ChannelNotifier>) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if let Some(events) = events {
        registry.register(Box::new(events.clone()));
    }
    registry
}

/// The kubectl merger, or `None` when merging is turned off.
pub(crate) fn build_kubeconfig_merger(config: &Config) -> Option<Arc<dyn KubeconfigMerger>> {
    if !config.kubeconfig.merge {
        info!("Kubeconfig merging disabled");
        return None;
    }
    let target = config.kubeconfig.resolved_path();
    info!(target = %target.display(), "Merging kubeconfigs");
    Some(Arc::new(KubectlMerger::new(
        config.provisioner.kubectl.clone(),
        target,
    )))
}

/// Wire the k3d, docker and kubectl adapters.
#[must_use]
pub fn build_collaborators(config: &Config, events: Option<&ChannelNotifier>) -> Collaborators {
    Collaborators {
        provisioner: Arc::new(K3dProvisioner::new(config.provisioner.clone())),
        registry: Arc::new(DockerRegistryRuntime::new(
            config.provisioner.docker.clone(),
            &config.registry,
        )),
        kubeconfig: build_kubeconfig_merger(config),
        notifier: Arc::new(build_notifier_registry(events)),
    }
}

/// Build an orchestrator backed by the real adapters.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn build_orchestrator(config: &Config, events: Option<&ChannelNotifier>) -> Orchestrator {
    Orchestrator::new(config.orchestrator_settings(), build_collaborators(config, events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_registry_includes_channel_when_given() {
        assert_eq!(build_notifier_registry(None).len(), 1);
        let events = ChannelNotifier::new();
        assert_eq!(build_notifier_registry(Some(&events)).len(), 2);
    }

    #[test]
    fn merger_follows_merge_flag() {
        let mut config = Config::default();
        assert!(build_kubeconfig_merger(&config).is_some());
        config.kubeconfig.merge = false;
        assert!(build_kubeconfig_merger(&config).is_none());
    }

    #[tokio::test]
    async fn builds_orchestrator_with_empty_pool() {
        let orchestrator = build_orchestrator(&Config::default(), None);
        assert!(orchestrator.list().is_empty());
        assert!(orchestrator.active().is_none());
    }
}
