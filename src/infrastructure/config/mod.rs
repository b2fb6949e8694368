//! Infrastructure configuration modules.

use std::path::PathBuf;

pub mod cluster;
pub mod hooks;
pub mod kubeconfig;
pub mod logging;
pub mod network;
pub mod pool;
pub mod provisioner;
pub mod registry;
pub mod settings;

/// Returns the kpool home directory (`~/.kpool/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kpool")
}
