//! Kubeconfig merger backed by `kubectl config`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::command::{run, run_with_env};
use crate::error::Result;
use crate::port::{KubeconfigEntry, KubeconfigMerger};

/// Merges per-cluster kubeconfigs into `target` (usually `~/.kube/config`).
pub struct KubectlMerger {
    kubectl: String,
    target: PathBuf,
}

impl KubectlMerger {
    pub fn new(kubectl: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            kubectl: kubectl.into(),
            target: target.into(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    fn target_arg(&self) -> String {
        self.target.display().to_string()
    }
}

/// Context name k3d writes for a cluster.
pub(crate) fn context_name(cluster: &str) -> String {
    format!("k3d-{cluster}")
}

/// `KUBECONFIG` value listing `entry` first so its entries win.
pub(crate) fn merge_search_path(entry: &Path, target: &Path) -> Result<std::ffi::OsString> {
    let mut paths = vec![entry.to_path_buf()];
    if target.exists() {
        paths.push(target.to_path_buf());
    }
    std::env::join_paths(paths).map_err(|e| {
        crate::error::Error::command_failed("kubectl", format!("bad kubeconfig path: {e}"))
    })
}

#[async_trait]
impl KubeconfigMerger for KubectlMerger {
    async fn merge(&self, entry: &KubeconfigEntry, is_active: bool) -> Result<()> {
        let search = merge_search_path(&entry.path, &self.target)?;
        let merged = run_with_env(
            &self.kubectl,
            ["config", "view", "--merge", "--flatten"],
            [("KUBECONFIG", search)],
        )
        .await?;
        let merged = format!("{merged}\n");

        let current = tokio::fs::read_to_string(&self.target).await.ok();
        if current.as_deref() == Some(merged.as_str()) {
            debug!(cluster = %entry.name, "Kubeconfig already up to date");
        } else {
            if let Some(parent) = self.target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&self.target, merged).await?;
            debug!(cluster = %entry.name, target = %self.target.display(), "Kubeconfig merged");
        }

        if is_active {
            let context = context_name(&entry.name);
            run(
                &self.kubectl,
                [
                    "--kubeconfig",
                    self.target_arg().as_str(),
                    "config",
                    "use-context",
                    context.as_str(),
                ],
            )
            .await?;
            info!(cluster = %entry.name, context = %context, "Switched kubectl context");
        }
        Ok(())
    }

    async fn remove(&self, entry: &KubeconfigEntry) -> Result<()> {
        if !self.target.exists() {
            return Ok(());
        }
        let context = context_name(&entry.name);
        let user = format!("admin@{context}");
        let target = self.target_arg();
        for (verb, item) in [
            ("delete-context", context.as_str()),
            ("delete-cluster", context.as_str()),
            ("delete-user", user.as_str()),
        ] {
            // Entries may be missing when the merge never happened.
            if let Err(e) = run(
                &self.kubectl,
                ["--kubeconfig", target.as_str(), "config", verb, item],
            )
            .await
            {
                debug!(cluster = %entry.name, verb, error = %e, "Kubeconfig entry not removed");
            }
        }
        Ok(())
    }
}
