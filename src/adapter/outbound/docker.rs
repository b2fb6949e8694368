//! Registry runtime backed by a docker container.

use async_trait::async_trait;
use tracing::{debug, info};

use super::command::run;
use crate::domain::{RegistryConfig, RegistryMode};
use crate::error::Result;
use crate::infrastructure::config::registry::RegistrySettings;
use crate::port::RegistryRuntime;

/// Runs the shared registry as `docker run <image>`.
///
/// The container listens on 5000 and is published on the configured port.
/// Images live in the configured volume, which `stop` leaves in place.
pub struct DockerRegistryRuntime {
    docker: String,
    image: String,
    upstream: String,
}

impl DockerRegistryRuntime {
    #[must_use]
    pub fn new(docker: impl Into<String>, settings: &RegistrySettings) -> Self {
        Self {
            docker: docker.into(),
            image: settings.image.clone(),
            upstream: settings.upstream.clone(),
        }
    }

    /// `Some(true)` when running, `Some(false)` when stopped, `None` when absent.
    async fn container_state(&self, name: &str) -> Option<bool> {
        run(&self.docker, ["inspect", "-f", "{{.State.Running}}", name])
            .await
            .ok()
            .map(|out| out == "true")
    }
}

#[async_trait]
impl RegistryRuntime for DockerRegistryRuntime {
    async fn start(&self, config: &RegistryConfig) -> Result<()> {
        match self.container_state(&config.name).await {
            Some(true) => {
                debug!(registry = %config.name, "Registry container already running");
            }
            Some(false) => {
                info!(registry = %config.name, "Starting stopped registry container");
                run(&self.docker, ["start", config.name.as_str()]).await?;
            }
            None => {
                info!(registry = %config, image = %self.image, "Creating registry container");
                run(&self.docker, run_args(config, &self.image, &self.upstream)).await?;
            }
        }
        Ok(())
    }

    async fn stop(&self, config: &RegistryConfig) -> Result<()> {
        info!(registry = %config.name, "Removing registry container");
        run(&self.docker, ["rm", "-f", config.name.as_str()]).await?;
        Ok(())
    }
}

/// Arguments for `docker run` creating the registry container.
pub(crate) fn run_args(config: &RegistryConfig, image: &str, upstream: &str) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        config.name.clone(),
        "--restart".to_string(),
        "unless-stopped".to_string(),
        "-p".to_string(),
        format!("{}:5000", config.port),
    ];
    if let Some(volume) = &config.volume {
        args.push("-v".to_string());
        args.push(format!("{volume}:/var/lib/registry"));
    }
    if config.mode == RegistryMode::PullThroughCache {
        args.push("-e".to_string());
        args.push(format!("REGISTRY_PROXY_REMOTEURL={upstream}"));
    }
    args.push(image.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_registry_publishes_port() {
        let config = RegistryConfig::new(RegistryMode::ReadWrite, "registry.localhost", 5001);
        let args = run_args(&config, "registry:2", "https://registry-1.docker.io");
        assert_eq!(
            args,
            [
                "run",
                "-d",
                "--name",
                "registry.localhost",
                "--restart",
                "unless-stopped",
                "-p",
                "5001:5000",
                "registry:2"
            ]
        );
    }

    #[test]
    fn pull_through_cache_sets_upstream_and_volume() {
        let config = RegistryConfig::new(RegistryMode::PullThroughCache, "cache", 5000)
            .with_volume("kpool-images");
        let args = run_args(&config, "registry:2", "https://mirror.example");
        assert!(args.contains(&"kpool-images:/var/lib/registry".to_string()));
        assert!(args.contains(&"REGISTRY_PROXY_REMOTEURL=https://mirror.example".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("registry:2"));
    }
}
