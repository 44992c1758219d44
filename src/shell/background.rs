//! Background job registry (spec §4.2).
//!
//! Grounds on `examples/BinaryMuse-ouro/src/orchestration/background_proc.rs`'s
//! spawn/monitor/cancellation-race structure, adapted: line-capped
//! `VecDeque<String>` -> a byte-capped buffer; UUID ids -> `job_<unix>_<n>`
//! ids; the teacher's `SubAgentManager` (parent/child sub-agent hierarchy,
//! out of scope here) is dropped in favor of a flat id-keyed registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::Command;

use crate::error::ShellError;
use crate::procgroup::{self, ProcessGroupHandle};

use super::detect::detect_shell;

/// Background job output buffers are capped at 10 MiB; bytes past the cap
/// are silently dropped (the writer still reports success to the child).
pub const MAX_JOB_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const STATUS_RUNNING: u8 = 0;
const STATUS_COMPLETED: u8 = 1;
const STATUS_STOPPED: u8 = 2;
const STATUS_FAILED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Stopped,
    Failed,
}

impl JobStatus {
    fn from_code(code: u8) -> Self {
        match code {
            STATUS_RUNNING => JobStatus::Running,
            STATUS_COMPLETED => JobStatus::Completed,
            STATUS_STOPPED => JobStatus::Stopped,
            _ => JobStatus::Failed,
        }
    }

    fn code(self) -> u8 {
        match self {
            JobStatus::Running => STATUS_RUNNING,
            JobStatus::Completed => STATUS_COMPLETED,
            JobStatus::Stopped => STATUS_STOPPED,
            JobStatus::Failed => STATUS_FAILED,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Stopped => "stopped",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A byte-capped output sink. Writes past the cap succeed from the writer's
/// point of view but are discarded (spec's "bounded writer").
#[derive(Default)]
struct BoundedBuffer {
    inner: RwLock<Vec<u8>>,
}

impl BoundedBuffer {
    fn append(&self, chunk: &[u8]) {
        let mut buf = self.inner.write().expect("job output buffer poisoned");
        if buf.len() >= MAX_JOB_OUTPUT_BYTES {
            return;
        }
        let remaining = MAX_JOB_OUTPUT_BYTES - buf.len();
        let take = remaining.min(chunk.len());
        buf.extend_from_slice(&chunk[..take]);
    }

    fn snapshot(&self) -> Vec<u8> {
        self.inner.read().expect("job output buffer poisoned").clone()
    }

    fn is_full(&self) -> bool {
        self.inner.read().expect("job output buffer poisoned").len() >= MAX_JOB_OUTPUT_BYTES
    }
}

pub struct BackgroundJob {
    pub id: String,
    pub cmd: String,
    pub cwd: Option<String>,
    pub started_at: SystemTime,
    status: AtomicU8,
    exit_code: Mutex<Option<i32>>,
    error: Mutex<Option<String>>,
    output: BoundedBuffer,
    group: Mutex<Option<ProcessGroupHandle>>,
}

impl BackgroundJob {
    pub fn status(&self) -> JobStatus {
        JobStatus::from_code(self.status.load(Ordering::SeqCst))
    }

    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().expect("exit_code mutex poisoned")
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed().unwrap_or_default()
    }

    fn set_group(&self, group: ProcessGroupHandle) {
        *self.group.lock().expect("group mutex poisoned") = Some(group);
    }

    /// CAS `running -> stopped`; on success, kill the process group.
    fn stop(&self) -> Result<(), ShellError> {
        match self
            .status
            .compare_exchange(STATUS_RUNNING, STATUS_STOPPED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                if let Some(group) = *self.group.lock().expect("group mutex poisoned") {
                    procgroup::kill(group)?;
                }
                Ok(())
            }
            Err(current) => Err(ShellError::NotRunning {
                id: self.id.clone(),
                status: JobStatus::from_code(current).to_string(),
            }),
        }
    }

    fn finish(&self, status: JobStatus, exit_code: Option<i32>, error: Option<String>) {
        // Only a still-running job transitions here; an externally-stopped
        // job must keep its `stopped` status and not be overwritten.
        if self
            .status
            .compare_exchange(STATUS_RUNNING, status.code(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.exit_code.lock().expect("exit_code mutex poisoned") = exit_code;
            *self.error.lock().expect("error mutex poisoned") = error;
        }
    }
}

/// A snapshot row for `list_background_jobs`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackgroundJobSummary {
    pub id: String,
    pub cmd: String,
    pub status: JobStatus,
    pub elapsed_secs: f64,
    pub exit_code: Option<i32>,
}

/// The background job registry: a read-mostly map guarded by an `RwLock`
/// (per spec §9's "concurrent map vs mutexed map" note), plus an
/// insertion-order sidecar so listings are stable, and a monotonic counter
/// feeding `job_<unix>_<counter>` ids.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<BackgroundJob>>>,
    order: Mutex<Vec<String>>,
    counter: AtomicU64,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            counter: AtomicU64::new(1),
        }
    }
}

impl JobRegistry {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("job_{unix}_{n}")
    }

    /// Spawn `cmd` in `cwd` (or the engine workspace if `None`) as a
    /// background job and return its id immediately; the supervisor task
    /// runs independently of the caller's context.
    pub async fn start(&self, cmd: String, cwd: Option<String>, workspace: &std::path::Path) -> Result<String, ShellError> {
        let id = self.next_id();
        let shell = detect_shell();
        let effective_cwd = match cwd.as_deref().map(str::trim) {
            None | Some("") | Some(".") => workspace.to_path_buf(),
            Some(other) => std::path::PathBuf::from(other),
        };

        let mut command = Command::new(&shell.program);
        command
            .arg(&shell.flag)
            .arg(&cmd)
            .current_dir(&effective_cwd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        procgroup::attach(&mut command);

        let mut child = command.spawn().map_err(ShellError::Spawn)?;
        let pid = child.id();

        let job = Arc::new(BackgroundJob {
            id: id.clone(),
            cmd: cmd.clone(),
            cwd,
            started_at: SystemTime::now(),
            status: AtomicU8::new(STATUS_RUNNING),
            exit_code: Mutex::new(None),
            error: Mutex::new(None),
            output: BoundedBuffer::default(),
            group: Mutex::new(None),
        });

        if let Some(pid) = pid {
            let group = procgroup::handle_for_pid(pid)?;
            job.set_group(group);
        }

        tracing::info!(job_id = %id, cmd = %cmd, "background job spawned");

        self.jobs.write().expect("jobs lock poisoned").insert(id.clone(), job.clone());
        self.order.lock().expect("order lock poisoned").push(id.clone());

        spawn_supervisor(job, child);

        Ok(id)
    }

    pub fn list(&self) -> Vec<BackgroundJobSummary> {
        let jobs = self.jobs.read().expect("jobs lock poisoned");
        let order = self.order.lock().expect("order lock poisoned");
        order
            .iter()
            .filter_map(|id| jobs.get(id))
            .map(|job| BackgroundJobSummary {
                id: job.id.clone(),
                cmd: job.cmd.clone(),
                status: job.status(),
                elapsed_secs: job.elapsed().as_secs_f64(),
                exit_code: job.exit_code(),
            })
            .collect()
    }

    pub fn view(&self, id: &str) -> Result<String, ShellError> {
        let job = self.get(id)?;
        let raw = job.output.snapshot();
        let mut text = String::from_utf8_lossy(&raw).into_owned();
        if job.output.is_full() {
            text.push_str(&format!("\n[output truncated at {MAX_JOB_OUTPUT_BYTES} bytes]"));
        }
        Ok(text)
    }

    pub fn stop(&self, id: &str) -> Result<String, ShellError> {
        let job = self.get(id)?;
        job.stop()?;
        tracing::info!(job_id = %id, "background job stop requested");
        Ok(format!("Job {id} stopped successfully"))
    }

    fn get(&self, id: &str) -> Result<Arc<BackgroundJob>, ShellError> {
        self.jobs
            .read()
            .expect("jobs lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| ShellError::UnknownJob(id.to_string()))
    }

    /// Engine shutdown: CAS every running job to `stopped` and kill its
    /// group. Errors from individual jobs (already terminal) are ignored.
    pub fn stop_all(&self) {
        let ids: Vec<String> = self.jobs.read().expect("jobs lock poisoned").keys().cloned().collect();
        for id in ids {
            if let Ok(job) = self.get(&id) {
                let _ = job.stop();
            }
        }
    }
}

fn spawn_supervisor(job: Arc<BackgroundJob>, mut child: tokio::process::Child) {
    if let Some(stdout) = child.stdout.take() {
        spawn_drain(stdout, job.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_drain(stderr, job.clone());
    }

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                let code = status.code();
                if code == Some(0) {
                    job.finish(JobStatus::Completed, code, None);
                } else {
                    job.finish(JobStatus::Failed, code.or(Some(-1)), Some(format!("exit status: {status}")));
                }
            }
            Err(e) => {
                job.finish(JobStatus::Failed, Some(-1), Some(e.to_string()));
            }
        }
        tracing::info!(job_id = %job.id, status = %job.status(), "background job reached a terminal state");
    });
}

fn spawn_drain(mut reader: impl tokio::io::AsyncRead + Unpin + Send + 'static, job: Arc<BackgroundJob>) {
    use tokio::io::AsyncReadExt;
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => job.output.append(&chunk[..n]),
            }
        }
    });
}
