//! Hook runner: user scripts around cluster creation and destruction.
//!
//! Hooks never block or fail a lifecycle operation. [`HookRunner::run`]
//! returns immediately; the script runs on a background task bounded by the
//! configured timeout, and failures are logged and reported as
//! [`Event::HookFailed`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Cluster, ClusterId, HookAction, HookInvocation};
use crate::port::{Event, Notifier};

/// Scripts the runner executes and how long each may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSettings {
    pub create: Option<PathBuf>,
    pub destroy: Option<PathBuf>,
    pub timeout: Duration,
    /// Prefix for exported variable names; empty for none.
    pub env_prefix: String,
}

impl HookSettings {
    /// Script configured for `action`, if any.
    #[must_use]
    pub fn script_for(&self, action: HookAction) -> Option<&Path> {
        match action {
            HookAction::Create => self.create.as_deref(),
            HookAction::Destroy => self.destroy.as_deref(),
        }
    }
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            create: None,
            destroy: None,
            timeout: Duration::from_secs(60),
            env_prefix: String::new(),
        }
    }
}

/// How a single hook run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No script is configured for the action.
    Skipped,
    Succeeded,
    /// The script exited non-zero (`code` is `None` when killed by a signal).
    Failed { code: Option<i32>, stderr: String },
    TimedOut,
    /// The configured script does not exist.
    Missing,
    /// The script exists but could not be started.
    SpawnFailed(String),
}

impl HookOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Skipped | Self::Succeeded)
    }
}

impl fmt::Display for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed { code: Some(code), stderr } if !stderr.is_empty() => {
                write!(f, "exited with status {code}: {stderr}")
            }
            Self::Failed { code: Some(code), .. } => write!(f, "exited with status {code}"),
            Self::Failed { code: None, .. } => f.write_str("terminated by signal"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Missing => f.write_str("script not found"),
            Self::SpawnFailed(reason) => write!(f, "could not be started: {reason}"),
        }
    }
}

/// Runs hook scripts, ordered per cluster and concurrent across clusters.
pub struct HookRunner {
    settings: Arc<HookSettings>,
    notifier: Arc<dyn Notifier>,
    /// Last hook task per cluster; the next hook for that cluster awaits it.
    chains: DashMap<ClusterId, Option<JoinHandle<()>>>,
}

impl HookRunner {
    pub fn new(settings: HookSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            settings: Arc::new(settings),
            notifier,
            chains: DashMap::new(),
        }
    }

    /// Schedule the hook for `action` on `cluster`.
    ///
    /// `provisioned` is false for the create hook of a failed provisioning;
    /// the script then only receives `ACTION` and `CLUSTER_NAME`.
    pub fn run(&self, action: HookAction, cluster: Cluster, provisioned: bool) {
        if self.settings.script_for(action).is_none() {
            return;
        }

        self.chains
            .retain(|_, task| task.as_ref().is_some_and(|t| !t.is_finished()));

        let id = cluster.id;
        let invocation = HookInvocation::new(action, cluster, provisioned, &self.settings.env_prefix);
        let settings = Arc::clone(&self.settings);
        let notifier = Arc::clone(&self.notifier);

        let mut slot = self.chains.entry(id).or_insert(None);
        let previous = slot.take();
        *slot = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let outcome = execute(&settings, &invocation).await;
            report(notifier.as_ref(), &invocation, &outcome);
        }));
    }

    /// Run the hook for `invocation` to completion on the current task.
    pub async fn execute(&self, invocation: &HookInvocation) -> HookOutcome {
        execute(&self.settings, invocation).await
    }

    /// Wait for every scheduled hook to finish.
    pub async fn wait_idle(&self) {
        let pending: Vec<JoinHandle<()>> = self
            .chains
            .iter_mut()
            .filter_map(|mut entry| entry.value_mut().take())
            .collect();
        join_all(pending).await;
        self.chains.retain(|_, task| task.is_some());
    }

    /// Number of clusters with a hook still scheduled or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.chains
            .iter()
            .filter(|entry| entry.value().as_ref().is_some_and(|t| !t.is_finished()))
            .count()
    }
}

async fn execute(settings: &HookSettings, invocation: &HookInvocation) -> HookOutcome {
    let Some(script) = settings.script_for(invocation.action) else {
        return HookOutcome::Skipped;
    };
    if tokio::fs::metadata(script).await.is_err() {
        return HookOutcome::Missing;
    }

    info!(
        action = %invocation.action,
        cluster = %invocation.cluster.name(),
        script = %script.display(),
        "Running hook"
    );

    let child = Command::new(script)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(e) => return HookOutcome::SpawnFailed(e.to_string()),
    };

    match tokio::time::timeout(settings.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => {
            log_output(script, &output.stdout);
            HookOutcome::Succeeded
        }
        Ok(Ok(output)) => {
            log_output(script, &output.stdout);
            HookOutcome::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        }
        Ok(Err(e)) => HookOutcome::SpawnFailed(e.to_string()),
        // Dropping the wait future kills the child.
        Err(_) => HookOutcome::TimedOut,
    }
}

fn log_output(script: &Path, stdout: &[u8]) {
    let stdout = String::from_utf8_lossy(stdout);
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        debug!(script = %script.display(), "{line}");
    }
}

fn report(notifier: &dyn Notifier, invocation: &HookInvocation, outcome: &HookOutcome) {
    if !outcome.is_failure() {
        return;
    }
    warn!(
        action = %invocation.action,
        cluster = %invocation.cluster.name(),
        outcome = %outcome,
        "Hook failed"
    );
    notifier.notify(Event::HookFailed {
        action: invocation.action,
        cluster: invocation.cluster.name().to_string(),
        reason: outcome.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClusterSpec;
    use crate::port::NullNotifier;

    fn runner(create: Option<PathBuf>) -> HookRunner {
        HookRunner::new(
            HookSettings {
                create,
                ..HookSettings::default()
            },
            Arc::new(NullNotifier),
        )
    }

    fn invocation(action: HookAction) -> HookInvocation {
        let cluster = Cluster::provisioning(ClusterSpec::new("c1"), 6500, false);
        HookInvocation::new(action, cluster, false, "")
    }

    #[tokio::test]
    async fn unconfigured_action_is_skipped() {
        let outcome = runner(None).execute(&invocation(HookAction::Create)).await;
        assert_eq!(outcome, HookOutcome::Skipped);
    }

    #[tokio::test]
    async fn missing_script_is_reported() {
        let runner = runner(Some(PathBuf::from("/nonexistent/kpool-hook")));
        let outcome = runner.execute(&invocation(HookAction::Create)).await;
        assert_eq!(outcome, HookOutcome::Missing);
        assert!(outcome.is_failure());
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(HookOutcome::TimedOut.to_string(), "timed out");
        assert_eq!(
            HookOutcome::Failed {
                code: Some(3),
                stderr: "bad".into()
            }
            .to_string(),
            "exited with status 3: bad"
        );
    }
}
