//! Kubeconfig merger fake.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::port::{KubeconfigEntry, KubeconfigMerger};

/// Records merges and removals and tracks the selected context.
#[derive(Default)]
pub struct RecordingMerger {
    merged: Mutex<Vec<(String, bool)>>,
    removed: Mutex<Vec<String>>,
    current: Mutex<Option<String>>,
    fail: Mutex<bool>,
}

impl RecordingMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// `(cluster name, is_active)` for every merge call.
    pub fn merged(&self) -> Vec<(String, bool)> {
        self.merged.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    /// The cluster whose context was last selected.
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if *self.fail.lock().unwrap() {
            Err(Error::command_failed("kubectl", "kubeconfig is read-only"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KubeconfigMerger for RecordingMerger {
    async fn merge(&self, entry: &KubeconfigEntry, is_active: bool) -> Result<()> {
        self.check()?;
        self.merged
            .lock()
            .unwrap()
            .push((entry.name.clone(), is_active));
        if is_active {
            *self.current.lock().unwrap() = Some(entry.name.clone());
        }
        Ok(())
    }

    async fn remove(&self, entry: &KubeconfigEntry) -> Result<()> {
        self.check()?;
        self.removed.lock().unwrap().push(entry.name.clone());
        let mut current = self.current.lock().unwrap();
        if current.as_deref() == Some(entry.name.as_str()) {
            *current = None;
        }
        Ok(())
    }
}
