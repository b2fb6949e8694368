//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the collaborators the orchestrator calls into:
//! the provisioning engine, the registry container runtime, the kubeconfig
//! merger, and notification sinks.

pub mod kubeconfig;
pub mod notifier;
pub mod provisioner;
pub mod registry;
