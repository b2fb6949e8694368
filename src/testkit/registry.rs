//! Registry runtime fake.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::RegistryConfig;
use crate::error::{Error, Result};
use crate::port::RegistryRuntime;

/// Counts starts and stops, failing on demand.
#[derive(Default)]
pub struct RecordingRegistryRuntime {
    started: Mutex<Vec<RegistryConfig>>,
    stopped: Mutex<Vec<RegistryConfig>>,
    start_failures: Mutex<VecDeque<String>>,
    stop_failures: Mutex<VecDeque<String>>,
}

impl RecordingRegistryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start` call fail with `reason`.
    pub fn fail_next_start(&self, reason: &str) {
        self.start_failures.lock().unwrap().push_back(reason.to_string());
    }

    /// Make the next `stop` call fail with `reason`.
    pub fn fail_next_stop(&self, reason: &str) {
        self.stop_failures.lock().unwrap().push_back(reason.to_string());
    }

    /// Start calls, including failed ones.
    pub fn starts(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Stop calls, including failed ones.
    pub fn stops(&self) -> usize {
        self.stopped.lock().unwrap().len()
    }

    pub fn started(&self) -> Vec<RegistryConfig> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryRuntime for RecordingRegistryRuntime {
    async fn start(&self, config: &RegistryConfig) -> Result<()> {
        self.started.lock().unwrap().push(config.clone());
        match self.start_failures.lock().unwrap().pop_front() {
            Some(reason) => Err(Error::command_failed("docker run", reason)),
            None => Ok(()),
        }
    }

    async fn stop(&self, config: &RegistryConfig) -> Result<()> {
        self.stopped.lock().unwrap().push(config.clone());
        match self.stop_failures.lock().unwrap().pop_front() {
            Some(reason) => Err(Error::command_failed("docker rm", reason)),
            None => Ok(()),
        }
    }
}
