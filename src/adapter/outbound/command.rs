//! Running external CLIs (`k3d`, `docker`, `kubectl`).

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Run `program` with `args` and return its trimmed stdout.
///
/// A non-zero exit becomes [`Error::Command`] carrying stderr.
pub(crate) async fn run<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_with_env(program, args, std::iter::empty::<(&str, &OsStr)>()).await
}

/// Like [`run`], with extra environment variables.
pub(crate) async fn run_with_env<I, S, E, K, V>(program: &str, args: I, env: E) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(command = ?command.as_std(), "Running command");

    let output = command
        .output()
        .await
        .map_err(|e| Error::command_failed(program, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(Error::command_failed(program, reason));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run("sh", ["-c", "echo hello"]).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let err = run("sh", ["-c", "echo nope >&2; exit 3"]).await.unwrap_err();
        assert_eq!(err.to_string(), "command 'sh' failed: nope");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        assert!(run("kpool-no-such-binary", ["x"]).await.is_err());
    }

    #[tokio::test]
    async fn passes_environment() {
        let out = run_with_env("sh", ["-c", "echo $KPOOL_TEST"], [("KPOOL_TEST", "set")])
            .await
            .unwrap();
        assert_eq!(out, "set");
    }
}
