//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`provisioner`] - `ScriptedProvisioner`, a fake engine with scripted
//!   failures, delays and a call log.
//! - [`registry`] - `RecordingRegistryRuntime`, counts registry starts/stops.
//! - [`kubeconfig`] - `RecordingMerger`, records merges and the current context.
//! - [`notifier`] - `RecordingNotifier`, collects emitted events.
//! - [`config`] - Canonical test configurations.
//! - [`harness`] - An orchestrator wired to all of the above.

pub mod config;
pub mod harness;
pub mod kubeconfig;
pub mod notifier;
pub mod provisioner;
pub mod registry;

use std::time::Duration;

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition was met.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
