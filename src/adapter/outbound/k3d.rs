//! Provisioner backed by the `k3d` CLI.
//!
//! Clusters are created with `k3d cluster create`, their kubeconfig is
//! written to `<kubeconfig_dir>/<name>.yaml` and the master IP is read from
//! the server container. When a cluster uses the shared registry, a
//! `registries.yaml` mirroring it is passed to k3s and the registry
//! container is connected to the cluster network.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::command::run;
use crate::domain::{Cluster, RegistryConfig};
use crate::error::{Error, Result};
use crate::infrastructure::config::provisioner::ProvisionerConfig;
use crate::port::{DiscoveredCluster, ProvisionRequest, ProvisionedCluster, Provisioner};

/// Port the registry listens on inside its container.
const REGISTRY_CONTAINER_PORT: u16 = 5000;

pub struct K3dProvisioner {
    config: ProvisionerConfig,
    kubeconfig_dir: PathBuf,
}

impl K3dProvisioner {
    #[must_use]
    pub fn new(config: ProvisionerConfig) -> Self {
        let kubeconfig_dir = config.resolved_kubeconfig_dir();
        Self {
            config,
            kubeconfig_dir,
        }
    }

    fn kubeconfig_path(&self, name: &str) -> PathBuf {
        self.kubeconfig_dir.join(format!("{name}.yaml"))
    }

    fn registries_path(&self, name: &str) -> PathBuf {
        self.kubeconfig_dir.join(format!("{name}-registries.yaml"))
    }

    async fn bring_up(&self, request: &ProvisionRequest) -> Result<ProvisionedCluster> {
        let registries = match &request.registry {
            Some(registry) => {
                let path = self.registries_path(&request.name);
                tokio::fs::write(&path, registries_yaml(registry)).await?;
                Some(path)
            }
            None => None,
        };

        let args = create_args(request, self.config.wait_secs, registries.as_deref());
        run(&self.config.k3d, &args).await?;

        if let Some(registry) = &request.registry {
            let network = format!("k3d-{}", request.name);
            if let Err(e) = run(
                &self.config.docker,
                ["network", "connect", network.as_str(), registry.name.as_str()],
            )
            .await
            {
                // Already connected from an earlier cluster of the same name.
                debug!(cluster = %request.name, error = %e, "Registry network connect skipped");
            }
        }

        let kubeconfig = run(&self.config.k3d, ["kubeconfig", "get", request.name.as_str()]).await?;
        let kubeconfig_path = self.kubeconfig_path(&request.name);
        tokio::fs::write(&kubeconfig_path, format!("{kubeconfig}\n")).await?;

        let master_ip = self.server_ip(&request.name).await?;
        if master_ip.is_empty() {
            return Err(Error::command_failed(
                self.config.docker.clone(),
                format!("no IP address for {}", server_container(&request.name)),
            ));
        }

        Ok(ProvisionedCluster {
            master_ip,
            kubeconfig_path,
        })
    }

    async fn server_ip(&self, name: &str) -> Result<String> {
        run(
            &self.config.docker,
            [
                "inspect",
                "-f",
                "{{range .NetworkSettings.Networks}}{{.IPAddress}} {{end}}",
                server_container(name).as_str(),
            ],
        )
        .await
        .map(|out| out.split_whitespace().next().unwrap_or_default().to_string())
    }

    async fn remove_files(&self, name: &str) {
        for path in [self.kubeconfig_path(name), self.registries_path(name)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Could not remove file"),
            }
        }
    }
}

#[async_trait]
impl Provisioner for K3dProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionedCluster> {
        tokio::fs::create_dir_all(&self.kubeconfig_dir).await?;
        info!(cluster = %request.name, port = request.api_port, "k3d cluster create");

        match self.bring_up(request).await {
            Ok(provisioned) => Ok(provisioned),
            Err(e) => {
                // Leave nothing half-created behind.
                let _ = run(&self.config.k3d, ["cluster", "delete", request.name.as_str()]).await;
                self.remove_files(&request.name).await;
                Err(e)
            }
        }
    }

    async fn teardown(&self, cluster: &Cluster) -> Result<()> {
        info!(cluster = %cluster.name(), "k3d cluster delete");
        run(&self.config.k3d, ["cluster", "delete", cluster.name()]).await?;
        self.remove_files(cluster.name()).await;
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredCluster>> {
        let listing = run(&self.config.k3d, ["cluster", "list", "-o", "json"]).await?;
        let mut clusters = parse_cluster_list(&listing)?;
        for cluster in &mut clusters {
            let path = self.kubeconfig_path(&cluster.name);
            if tokio::fs::metadata(&path).await.is_ok() {
                cluster.kubeconfig_path = Some(path);
            }
            cluster.master_ip = self
                .server_ip(&cluster.name)
                .await
                .ok()
                .filter(|ip| !ip.is_empty());
        }
        Ok(clusters)
    }

    fn name(&self) -> &'static str {
        "k3d"
    }
}

fn server_container(name: &str) -> String {
    format!("k3d-{name}-server-0")
}

/// Arguments for `k3d cluster create`.
pub(crate) fn create_args(
    request: &ProvisionRequest,
    wait_secs: u64,
    registries: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "cluster".to_string(),
        "create".to_string(),
        request.name.clone(),
        "--api-port".to_string(),
        format!("{}:{}", request.api_address, request.api_port),
        "--agents".to_string(),
        request.workers.to_string(),
        "--wait".to_string(),
        "--timeout".to_string(),
        format!("{wait_secs}s"),
        "--kubeconfig-update-default=false".to_string(),
        "--kubeconfig-switch-context=false".to_string(),
        "--k3s-arg".to_string(),
        format!("--cluster-domain={}.local@server:0", request.name),
    ];
    for arg in &request.server_args {
        args.push("--k3s-arg".to_string());
        args.push(format!("{arg}@server:0"));
    }
    if let Some(image) = &request.image {
        args.push("--image".to_string());
        args.push(image.clone());
    }
    if let Some(path) = registries {
        args.push("--registry-config".to_string());
        args.push(path.display().to_string());
    }
    args
}

/// k3s `registries.yaml` routing pulls for `name:port` to the registry.
pub(crate) fn registries_yaml(registry: &RegistryConfig) -> String {
    format!(
        "mirrors:\n  \"{address}\":\n    endpoint:\n      - http://{name}:{REGISTRY_CONTAINER_PORT}\n",
        address = registry.address(),
        name = registry.name,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedCluster {
    name: String,
    #[serde(default)]
    agents_count: u32,
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
}

/// Parse `k3d cluster list -o json`.
pub(crate) fn parse_cluster_list(json: &str) -> Result<Vec<DiscoveredCluster>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let listed: Vec<ListedCluster> = serde_json::from_str(json)?;
    Ok(listed
        .into_iter()
        .filter_map(|cluster| {
            let api_port = cluster.nodes.iter().find_map(|node| {
                node.pointer("/serverOpts/kubeAPI/PortMapping/Binding/HostPort")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|port| port.parse::<u16>().ok())
            });
            match api_port {
                Some(api_port) => Some(DiscoveredCluster {
                    name: cluster.name,
                    workers: cluster.agents_count,
                    api_port,
                    master_ip: None,
                    kubeconfig_path: None,
                }),
                None => {
                    warn!(cluster = %cluster.name, "No API port in k3d listing, ignoring");
                    None
                }
            }
        })
        .collect())
}
