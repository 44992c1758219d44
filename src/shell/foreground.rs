//! Foreground shell execution (spec §4.1).
//!
//! Grounds on `examples/BinaryMuse-ouro/safety/mod.rs`'s "single entry point,
//! delegate to the underlying executor" shape and on
//! `orchestration/background_proc.rs`'s cancellation-races-the-wait
//! `tokio::select!` idiom, adapted from a ring-buffer background job to a
//! one-shot merged-output foreground run.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ShellError;
use crate::limiter::limit_output;
use crate::procgroup;

use super::detect::detect_shell;
use super::format::{format_outcome, Outcome};

/// Default inner deadline for a foreground command when the caller doesn't
/// override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Per-engine configuration shared by the foreground and background paths.
#[derive(Debug, Clone)]
pub struct ShellEngineConfig {
    pub default_timeout_secs: u64,
    pub workspace: PathBuf,
}

impl Default for ShellEngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            workspace: PathBuf::from("."),
        }
    }
}

/// A foreground `shell_exec` request.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ForegroundRequest {
    pub cmd: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Resolve the effective working directory: blank or `.` means "the
/// engine's configured workspace", anything else is used as given.
fn resolve_cwd(cwd: Option<&str>, workspace: &std::path::Path) -> PathBuf {
    match cwd.map(str::trim) {
        None | Some("") | Some(".") => workspace.to_path_buf(),
        Some(other) => PathBuf::from(other),
    }
}

/// Run `req` to completion (or cancellation/timeout), returning the
/// formatted, output-limited result string and whether the run should be
/// reported to the agent as an error.
///
/// A spawn failure is the only condition mapped to `Err` -- everything past
/// spawn (timeout, cancellation, nonzero exit, clean exit) is folded into
/// the returned string with `is_error=false`, per §4.1's failure mapping.
pub async fn run(
    config: &ShellEngineConfig,
    outer: &CancellationToken,
    req: ForegroundRequest,
) -> Result<String, ShellError> {
    let cwd = resolve_cwd(req.cwd.as_deref(), &config.workspace);
    let timeout = Duration::from_secs(req.timeout.unwrap_or(config.default_timeout_secs));
    let shell = detect_shell();

    let mut command = Command::new(&shell.program);
    command
        .arg(&shell.flag)
        .arg(&req.cmd)
        .current_dir(&cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    procgroup::attach(&mut command);

    tracing::debug!(cmd = %req.cmd, cwd = %cwd.display(), "foreground shell command starting");

    let mut child = command.spawn().map_err(ShellError::Spawn)?;
    let pid = child.id();
    let group = pid.map(procgroup::handle_for_pid).transpose()?;

    let output: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(drain_into(stdout, output.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(drain_into(stderr, output.clone())));
    }

    let outcome = tokio::select! {
        biased;
        _ = outer.cancelled() => {
            if let Some(g) = group {
                let _ = procgroup::kill(g);
            }
            let _ = child.wait().await;
            Outcome::Cancelled
        }
        _ = tokio::time::sleep(timeout) => {
            if let Some(g) = group {
                let _ = procgroup::kill(g);
            }
            let _ = child.wait().await;
            tracing::warn!(cmd = %req.cmd, timeout_secs = timeout.as_secs(), "foreground shell command timed out");
            Outcome::TimedOut(timeout)
        }
        status = child.wait() => {
            match status {
                Ok(status) if status.success() => Outcome::Exited,
                Ok(status) => {
                    tracing::warn!(cmd = %req.cmd, ?status, "foreground shell command exited nonzero");
                    Outcome::ProcessError(format!("exit status: {status}"))
                }
                Err(e) => {
                    tracing::warn!(cmd = %req.cmd, error = %e, "foreground shell command wait failed");
                    Outcome::ProcessError(e.to_string())
                }
            }
        }
    };

    for reader in readers {
        let _ = reader.await;
    }

    let raw = output.lock().expect("output buffer mutex poisoned").clone();
    Ok(limit_output(&format_outcome(outcome, &raw)))
}

async fn drain_into(mut reader: impl tokio::io::AsyncRead + Unpin, sink: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().expect("output buffer mutex poisoned").extend_from_slice(&chunk[..n]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workspace: &std::path::Path) -> ShellEngineConfig {
        ShellEngineConfig {
            default_timeout_secs: 30,
            workspace: workspace.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn echo_command_returns_trimmed_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            &config(dir.path()),
            &CancellationToken::new(),
            ForegroundRequest {
                cmd: "echo hello".to_string(),
                cwd: Some(String::new()),
                timeout: None,
            },
        )
        .await
        .unwrap();
        assert!(result.contains("hello"), "got: {result}");
    }

    #[tokio::test]
    async fn timeout_is_formatted_with_the_configured_duration() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            &config(dir.path()),
            &CancellationToken::new(),
            ForegroundRequest {
                cmd: "sleep 5".to_string(),
                cwd: Some(String::new()),
                timeout: Some(1),
            },
        )
        .await
        .unwrap();
        assert!(result.starts_with("Command timed out after 1s"), "got: {result}");
    }

    #[tokio::test]
    async fn outer_cancellation_before_timeout_reports_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let token_clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token_clone.cancel();
        });
        let result = run(
            &config(dir.path()),
            &token,
            ForegroundRequest {
                cmd: "sleep 5".to_string(),
                cwd: None,
                timeout: Some(30),
            },
        )
        .await
        .unwrap();
        assert_eq!(result, "Command cancelled");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_without_is_error_at_this_layer() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            &config(dir.path()),
            &CancellationToken::new(),
            ForegroundRequest {
                cmd: "exit 7".to_string(),
                cwd: None,
                timeout: None,
            },
        )
        .await
        .unwrap();
        assert!(result.starts_with("Error executing command:"), "got: {result}");
    }

    #[tokio::test]
    async fn blank_cwd_resolves_to_configured_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            &config(dir.path()),
            &CancellationToken::new(),
            ForegroundRequest {
                cmd: "pwd".to_string(),
                cwd: Some(".".to_string()),
                timeout: None,
            },
        )
        .await
        .unwrap();
        let canonical = std::fs::canonicalize(dir.path()).unwrap();
        assert!(result.contains(canonical.to_str().unwrap()) || result.contains(dir.path().to_str().unwrap()));
    }
}
