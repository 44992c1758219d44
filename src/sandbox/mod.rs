//! Docker-based container sandbox runner (spec §4.4).
//!
//! No crate in the corpus shells out to `docker` (or uses `bollard`); this
//! component is novel. It follows the teacher's general subprocess idiom
//! (`tokio::process::Command`, used throughout
//! `orchestration/background_proc.rs` and `safety/mod.rs`) applied to
//! `docker run/exec/stop/ps/inspect` instead of a shell, and the
//! `Arc<Mutex<..>>`-guarded single-resource pattern the teacher uses for its
//! `SafetyLayer`/output buffers, applied here to the one tracked container id.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SandboxError;

pub const SANDBOX_PID_LABEL: &str = "com.docker.cagent.sandbox.pid";
pub const SANDBOX_FLAG_LABEL: &str = "com.docker.cagent.sandbox=true";
const DEFAULT_IMAGE: &str = "alpine:latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    Ro,
    Rw,
}

impl MountMode {
    fn as_str(self) -> &'static str {
        match self {
            MountMode::Ro => "ro",
            MountMode::Rw => "rw",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MountSpec {
    pub host_path: PathBuf,
    pub mode: MountMode,
}

impl MountSpec {
    /// Parse a `PATH[:ro|:rw]` spec, resolving a relative `PATH` against
    /// `base` first and then the process cwd. Returns `None` (the spec is
    /// skipped, not an error) when neither resolves.
    pub fn parse(spec: &str, base: &Path) -> Option<Self> {
        let (path_part, mode) = match spec.rsplit_once(':') {
            Some((p, "ro")) => (p, MountMode::Ro),
            Some((p, "rw")) => (p, MountMode::Rw),
            _ => (spec, MountMode::Rw),
        };
        let candidate = PathBuf::from(path_part);
        let resolved = if candidate.is_absolute() {
            Some(candidate)
        } else {
            let under_base = base.join(&candidate);
            if under_base.exists() {
                Some(under_base)
            } else {
                std::env::current_dir().ok().map(|cwd| cwd.join(&candidate))
            }
        }?;
        Some(MountSpec {
            host_path: resolved,
            mode,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SandboxConfig {
    pub image: Option<String>,
    pub mounts: Vec<MountSpec>,
}

impl SandboxConfig {
    fn image(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }
}

/// Owns at most one container at a time. `ensure_container`, `stop`, and
/// `is_running` are serialized by `state`.
pub struct SandboxRunner {
    config: SandboxConfig,
    pid: u32,
    state: Mutex<Option<String>>,
}

impl SandboxRunner {
    /// Construct the runner and run best-effort orphan cleanup. A docker
    /// binary that is missing or too old to support the labels filter
    /// disables cleanup but never fails construction.
    pub async fn new(config: SandboxConfig) -> Self {
        let pid = std::process::id();
        let runner = Self {
            config,
            pid,
            state: Mutex::new(None),
        };
        runner.cleanup_orphans().await;
        runner
    }

    fn container_name(&self) -> String {
        format!("cagent-sandbox-{:08x}", self.pid ^ 0x9e37_79b9)
    }

    async fn cleanup_orphans(&self) {
        let output = match Command::new("docker")
            .args(["ps", "-a", "--filter", &format!("label={SANDBOX_FLAG_LABEL}"), "--format", "{{.ID}}"])
            .output()
            .await
        {
            Ok(o) if o.status.success() => o,
            _ => {
                tracing::warn!("docker ps unavailable or failed; skipping sandbox orphan cleanup");
                return;
            }
        };

        for id in String::from_utf8_lossy(&output.stdout).lines().map(str::trim).filter(|l| !l.is_empty()) {
            let pid_label = Command::new("docker")
                .args(["inspect", "-f", &format!("{{{{index .Config.Labels \"{SANDBOX_PID_LABEL}\"}}}}"), id])
                .output()
                .await
                .ok()
                .filter(|o| o.status.success())
                .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

            let Some(creator_pid) = pid_label.and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };

            if creator_pid == self.pid || crate::procgroup::is_alive(creator_pid) {
                continue;
            }

            tracing::info!(container_id = id, creator_pid, "stopping orphaned sandbox container");
            let _ = Command::new("docker").args(["stop", "-t", "1", id]).output().await;
        }
    }

    /// Ensure a live container exists, starting one if needed, and return
    /// its id.
    pub async fn ensure_container(&self) -> Result<String, SandboxError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.as_ref() {
            if self.is_running(id).await {
                return Ok(id.clone());
            }
            tracing::warn!(container_id = id, "sandbox container no longer running; restarting");
            *state = None;
        }

        let id = self.start_container().await?;
        *state = Some(id.clone());
        Ok(id)
    }

    async fn start_container(&self) -> Result<String, SandboxError> {
        let name = self.container_name();
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--rm".into(),
            "--init".into(),
            "--network".into(),
            "host".into(),
            "--name".into(),
            name.clone(),
            "--label".into(),
            "com.docker.cagent.sandbox=true".into(),
            "--label".into(),
            format!("{SANDBOX_PID_LABEL}={}", self.pid),
        ];

        for mount in &self.config.mounts {
            args.push("-v".into());
            args.push(format!(
                "{}:{}:{}",
                mount.host_path.display(),
                mount.host_path.display(),
                mount.mode.as_str()
            ));
        }

        for (key, value) in std::env::vars() {
            if is_posix_env_name(&key) {
                args.push("-e".into());
                args.push(format!("{key}={value}"));
            }
        }

        args.push(self.config.image().to_string());
        args.push("sleep".into());
        args.push("infinity".into());

        tracing::info!(name = %name, image = self.config.image(), "starting sandbox container");
        let output = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SandboxError::DockerUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(SandboxError::DockerCommandFailed {
                args: args.join(" "),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn is_running(&self, id: &str) -> bool {
        Command::new("docker")
            .args(["inspect", "-f", "{{.State.Running}}", id])
            .output()
            .await
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim() == "true")
            .unwrap_or(false)
    }

    /// Run `cmd` inside the container (starting one lazily if needed),
    /// racing the exec against `cancel`. On cancellation the exec child is
    /// killed; the container itself is left running.
    ///
    /// `output` is drained continuously (mirroring `shell::foreground`'s
    /// `drain_into`) rather than collected only at completion, so a caller
    /// racing this future against its own timeout can still read whatever
    /// was captured up to that point after this future is dropped.
    pub async fn exec(
        &self,
        cmd: &str,
        cwd: Option<&str>,
        cancel: &CancellationToken,
        output: Arc<StdMutex<Vec<u8>>>,
    ) -> Result<(String, Option<i32>), SandboxError> {
        let container = self.ensure_container().await?;

        let mut args = vec!["exec".to_string()];
        if let Some(cwd) = cwd.filter(|c| !c.is_empty() && *c != ".") {
            args.push("-w".to_string());
            args.push(cwd.to_string());
        }
        for (key, value) in std::env::vars() {
            if is_posix_env_name(&key) {
                args.push("-e".to_string());
                args.push(format!("{key}={value}"));
            }
        }
        args.push(container);
        args.push("/bin/sh".to_string());
        args.push("-c".to_string());
        args.push(cmd.to_string());

        let mut child = Command::new("docker")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::DockerUnavailable(e.to_string()))?;

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain_into(stdout, output.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain_into(stderr, output.clone())));
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                for reader in readers {
                    let _ = reader.await;
                }
                return Err(SandboxError::DockerCommandFailed {
                    args: args.join(" "),
                    exit_code: None,
                    stderr: "cancelled".to_string(),
                });
            }
            status = child.wait() => status.map_err(|e| SandboxError::DockerUnavailable(e.to_string()))?,
        };

        for reader in readers {
            let _ = reader.await;
        }

        let merged = String::from_utf8_lossy(&output.lock().expect("sandbox exec output buffer poisoned")).into_owned();
        Ok((merged, status.code()))
    }

    /// Stop the tracked container (1s grace) and clear the tracked id.
    pub async fn stop(&self) -> Result<(), SandboxError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.take() {
            tracing::info!(container_id = %id, "stopping sandbox container");
            let _ = Command::new("docker").args(["stop", "-t", "1", &id]).output().await;
        }
        Ok(())
    }
}

async fn drain_into(mut reader: impl tokio::io::AsyncRead + Unpin, sink: Arc<StdMutex<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().expect("sandbox exec output buffer poisoned").extend_from_slice(&chunk[..n]),
        }
    }
}

fn is_posix_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn drain_into_collects_bytes_written_after_the_call_starts() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let sink = Arc::new(StdMutex::new(Vec::new()));
        let draining = tokio::spawn(drain_into(reader, sink.clone()));
        writer.write_all(b"partial output").await.unwrap();
        drop(writer);
        draining.await.unwrap();
        assert_eq!(sink.lock().unwrap().as_slice(), b"partial output");
    }

    #[test]
    fn posix_env_name_accepts_standard_names() {
        assert!(is_posix_env_name("PATH"));
        assert!(is_posix_env_name("_HIDDEN"));
        assert!(is_posix_env_name("MY_VAR_2"));
    }

    #[test]
    fn posix_env_name_rejects_malformed_names() {
        assert!(!is_posix_env_name("2VAR"));
        assert!(!is_posix_env_name("MY-VAR"));
        assert!(!is_posix_env_name(""));
        assert!(!is_posix_env_name("HAS SPACE"));
    }

    #[test]
    fn mount_spec_parses_explicit_mode() {
        let dir = tempfile::tempdir().unwrap();
        let spec = MountSpec::parse(&format!("{}:ro", dir.path().display()), dir.path()).unwrap();
        assert_eq!(spec.mode, MountMode::Ro);
        assert_eq!(spec.host_path, dir.path());
    }

    #[test]
    fn mount_spec_defaults_to_rw() {
        let dir = tempfile::tempdir().unwrap();
        let spec = MountSpec::parse(&dir.path().display().to_string(), dir.path()).unwrap();
        assert_eq!(spec.mode, MountMode::Rw);
    }

    #[test]
    fn mount_spec_resolves_relative_path_against_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let spec = MountSpec::parse("sub:ro", dir.path()).unwrap();
        assert_eq!(spec.host_path, dir.path().join("sub"));
    }
}
