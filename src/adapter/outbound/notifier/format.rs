//! One-line descriptions of lifecycle events.

use crate::port::Event;

/// Describe an event for humans.
#[must_use]
pub fn describe(event: &Event) -> String {
    match event {
        Event::Creating { cluster } => format!(
            "creating {} on port {} ({} workers)",
            cluster.name(),
            cluster.api_port,
            cluster.worker_count()
        ),
        Event::Created { cluster } => match &cluster.master_ip {
            Some(ip) => format!("{} is {} (master {ip})", cluster.name(), cluster.state),
            None => format!("{} is {}", cluster.name(), cluster.state),
        },
        Event::CreateFailed { name, step, reason } => {
            format!("creating {name} failed at {step}: {reason}")
        }
        Event::Destroying { cluster } => format!("destroying {}", cluster.name()),
        Event::Destroyed { cluster } => format!("{} destroyed", cluster.name()),
        Event::DestroyFailed {
            name,
            restored,
            reason,
        } => format!("destroying {name} failed, back to {restored}: {reason}"),
        Event::Activated { cluster, .. } => format!("{} is now active", cluster.name()),
        Event::RegistryStarted { config } => format!("registry {config} started"),
        Event::RegistryStopped { config } => format!("registry {config} stopped"),
        Event::HookFailed {
            action,
            cluster,
            reason,
        } => format!("{action} hook for {cluster} {reason}"),
        Event::KubeconfigFailed { cluster, reason } => {
            format!("kubeconfig update for {cluster} failed: {reason}")
        }
        Event::Incomplete { cluster, state } => {
            format!("{cluster} abandoned while {state}")
        }
    }
}
