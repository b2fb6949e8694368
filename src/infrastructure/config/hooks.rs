//! Lifecycle hook script settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::hook::HookSettings;

/// Scripts run after cluster creation and destruction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HookConfig {
    /// Script run after a cluster was created (or failed to be).
    #[serde(default)]
    pub create: Option<PathBuf>,
    /// Script run after a cluster was destroyed.
    #[serde(default)]
    pub destroy: Option<PathBuf>,
    /// A script still running after this many seconds is killed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Prefix for exported variable names (`K3X` gives `K3X_ACTION`).
    #[serde(default)]
    pub env_prefix: String,
}

fn default_timeout_secs() -> u64 {
    60
}

impl From<&HookConfig> for HookSettings {
    fn from(config: &HookConfig) -> Self {
        Self {
            create: config.create.clone(),
            destroy: config.destroy.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            env_prefix: config.env_prefix.clone(),
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            create: None,
            destroy: None,
            timeout_secs: default_timeout_secs(),
            env_prefix: String::new(),
        }
    }
}
