//! Registry manager: reference-counted lifecycle of the shared registry.
//!
//! At most one registry exists per process. The first cluster to attach
//! starts it and fixes its configuration; the last one to detach removes it,
//! after which any configuration may be attached again.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{RegistryConfig, RegistryMode};
use crate::error::{LifecycleError, Result};
use crate::port::{Event, Notifier, RegistryRuntime};

/// Proof that one cluster holds a reference on the shared registry.
///
/// Handles are neither `Clone` nor `Copy`: [`RegistryManager::detach`] takes
/// one by value, so every attach is released at most once.
#[derive(Debug)]
#[must_use = "a registry handle must be detached, or the registry is never removed"]
pub struct RegistryHandle {
    config: RegistryConfig,
}

impl RegistryHandle {
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStatus {
    /// `Disabled` whenever no registry runs.
    pub mode: RegistryMode,
    pub config: Option<RegistryConfig>,
    pub ref_count: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    config: Option<RegistryConfig>,
    ref_count: usize,
}

/// Owns the shared registry's existence and reference count.
///
/// `attach` and `detach` serialize on one async lock that is held across the
/// runtime's start/stop call, so a teardown can never race a new attach.
pub struct RegistryManager {
    runtime: Arc<dyn RegistryRuntime>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<RegistryState>,
}

impl RegistryManager {
    pub fn new(runtime: Arc<dyn RegistryRuntime>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            runtime,
            notifier,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Take a reference on the registry described by `requested`, starting
    /// it if none runs.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidSpec`] for a `Disabled` request.
    /// - [`LifecycleError::RegistryConfigConflict`] when a registry with a
    ///   different mode, name or port is running.
    /// - [`LifecycleError::RegistryUnavailable`] when the runtime could not
    ///   start it. The reference count is unchanged in every error case.
    pub async fn attach(
        &self,
        requested: &RegistryConfig,
    ) -> std::result::Result<RegistryHandle, LifecycleError> {
        if !requested.mode.is_enabled() {
            return Err(LifecycleError::InvalidSpec {
                reason: "cannot attach a disabled registry".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(existing) = &state.config {
            if !existing.is_compatible_with(requested) {
                return Err(LifecycleError::RegistryConfigConflict {
                    existing: existing.clone(),
                    requested: requested.clone(),
                });
            }
            state.ref_count += 1;
            debug!(
                registry = %existing.address(),
                ref_count = state.ref_count,
                "Attached to running registry"
            );
            return Ok(RegistryHandle {
                config: existing.clone(),
            });
        }

        self.runtime.start(requested).await.map_err(|e| {
            LifecycleError::RegistryUnavailable {
                name: requested.name.clone(),
                reason: e.to_string(),
            }
        })?;

        state.config = Some(requested.clone());
        state.ref_count = 1;
        info!(
            registry = %requested.address(),
            mode = %requested.mode,
            "Registry started"
        );
        self.notifier.notify(Event::RegistryStarted {
            config: requested.clone(),
        });

        Ok(RegistryHandle {
            config: requested.clone(),
        })
    }

    /// Release a reference, removing the registry when it was the last one.
    ///
    /// # Errors
    ///
    /// Returns the runtime's error if removing the registry failed. The
    /// registry is forgotten either way, so the next attach starts afresh.
    pub async fn detach(&self, handle: RegistryHandle) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.ref_count == 0 {
            warn!(registry = %handle.config.address(), "Detach without a running registry");
            return Ok(());
        }
        state.ref_count -= 1;
        debug!(
            registry = %handle.config.address(),
            ref_count = state.ref_count,
            "Detached from registry"
        );
        if state.ref_count > 0 {
            return Ok(());
        }

        let Some(config) = state.config.take() else {
            return Ok(());
        };
        let stopped = self.runtime.stop(&config).await;
        match &stopped {
            Ok(()) => info!(registry = %config.address(), "Registry removed"),
            Err(e) => warn!(registry = %config.address(), error = %e, "Registry removal failed"),
        }
        self.notifier.notify(Event::RegistryStopped { config });
        stopped
    }

    pub async fn status(&self) -> RegistryStatus {
        let state = self.state.lock().await;
        RegistryStatus {
            mode: state
                .config
                .as_ref()
                .map_or(RegistryMode::Disabled, |c| c.mode),
            config: state.config.clone(),
            ref_count: state.ref_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NullNotifier;
    use crate::testkit::registry::RecordingRegistryRuntime;

    fn read_write() -> RegistryConfig {
        RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5000)
    }

    fn manager(runtime: Arc<RecordingRegistryRuntime>) -> RegistryManager {
        RegistryManager::new(runtime, Arc::new(NullNotifier))
    }

    #[tokio::test]
    async fn first_attach_starts_last_detach_stops() {
        let runtime = Arc::new(RecordingRegistryRuntime::new());
        let registry = manager(runtime.clone());

        let a = registry.attach(&read_write()).await.unwrap();
        let b = registry.attach(&read_write()).await.unwrap();
        assert_eq!(runtime.starts(), 1);
        assert_eq!(registry.status().await.ref_count, 2);

        registry.detach(a).await.unwrap();
        assert_eq!(runtime.stops(), 0);
        registry.detach(b).await.unwrap();
        assert_eq!(runtime.stops(), 1);

        let status = registry.status().await;
        assert_eq!(status.ref_count, 0);
        assert_eq!(status.mode, RegistryMode::Disabled);
        assert!(status.config.is_none());
    }

    #[tokio::test]
    async fn incompatible_request_conflicts() {
        let registry = manager(Arc::new(RecordingRegistryRuntime::new()));
        let _held = registry.attach(&read_write()).await.unwrap();

        let cache = RegistryConfig::new(RegistryMode::PullThroughCache, "registry.localhost", 5000);
        let err = registry.attach(&cache).await.unwrap_err();
        assert!(matches!(err, LifecycleError::RegistryConfigConflict { .. }));
        assert_eq!(registry.status().await.ref_count, 1);
    }

    #[tokio::test]
    async fn mode_can_change_once_released() {
        let registry = manager(Arc::new(RecordingRegistryRuntime::new()));
        let held = registry.attach(&read_write()).await.unwrap();
        registry.detach(held).await.unwrap();

        let cache = RegistryConfig::new(RegistryMode::PullThroughCache, "cache", 5001);
        let handle = registry.attach(&cache).await.unwrap();
        assert_eq!(handle.config(), &cache);
        assert_eq!(registry.status().await.mode, RegistryMode::PullThroughCache);
        registry.detach(handle).await.unwrap();
    }

    #[tokio::test]
    async fn start_failure_leaves_no_reference() {
        let runtime = Arc::new(RecordingRegistryRuntime::new());
        runtime.fail_next_start("port already allocated");
        let registry = manager(runtime.clone());

        let err = registry.attach(&read_write()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::RegistryUnavailable { .. }));
        assert_eq!(registry.status().await.ref_count, 0);

        let handle = registry.attach(&read_write()).await.unwrap();
        assert_eq!(runtime.starts(), 2);
        registry.detach(handle).await.unwrap();
    }

    #[tokio::test]
    async fn disabled_request_is_invalid() {
        let registry = manager(Arc::new(RecordingRegistryRuntime::new()));
        let disabled = RegistryConfig::new(RegistryMode::Disabled, "r", 5000);
        assert!(matches!(
            registry.attach(&disabled).await,
            Err(LifecycleError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn stop_failure_still_clears_registry() {
        let runtime = Arc::new(RecordingRegistryRuntime::new());
        runtime.fail_next_stop("container busy");
        let registry = manager(runtime.clone());

        let handle = registry.attach(&read_write()).await.unwrap();
        assert!(registry.detach(handle).await.is_err());
        assert_eq!(registry.status().await.ref_count, 0);
        assert!(registry.status().await.config.is_none());
    }
}
