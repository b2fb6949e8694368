//! Path utilities for kpool.
//!
//! All data lives under `~/.kpool/`:
//! - `~/.kpool/config.toml` - main configuration
//! - `~/.kpool/kubeconfigs/` - per-cluster kubeconfig files

use std::path::PathBuf;

pub use crate::infrastructure::config::home_dir;

/// Returns the default config file path (`~/.kpool/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}
