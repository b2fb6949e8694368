//! User kubeconfig settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where cluster kubeconfigs get merged to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KubeconfigConfig {
    /// Target file. Defaults to the first `$KUBECONFIG` entry, then
    /// `~/.kube/config`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Merge at all. When false the user's kubeconfig is never touched.
    #[serde(default = "default_merge")]
    pub merge: bool,
}

fn default_merge() -> bool {
    true
}

impl KubeconfigConfig {
    /// The file the merger writes to.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        if let Some(first) = std::env::var_os("KUBECONFIG")
            .as_ref()
            .and_then(|v| std::env::split_paths(v).next())
            .filter(|p| !p.as_os_str().is_empty())
        {
            return first;
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kube")
            .join("config")
    }
}

impl Default for KubeconfigConfig {
    fn default() -> Self {
        Self {
            path: None,
            merge: default_merge(),
        }
    }
}
