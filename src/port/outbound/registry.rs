//! Registry runtime port: the container behind the shared registry.

use async_trait::async_trait;

use crate::domain::RegistryConfig;
use crate::error::Result;

/// Starts and stops the shared registry instance.
///
/// The registry manager guarantees that `start` and `stop` calls are
/// serialized and strictly alternate for a given configuration.
#[async_trait]
pub trait RegistryRuntime: Send + Sync {
    async fn start(&self, config: &RegistryConfig) -> Result<()>;

    /// Remove the instance. Stored images (the volume) are kept.
    async fn stop(&self, config: &RegistryConfig) -> Result<()>;
}
