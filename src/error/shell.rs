use std::io;

/// Errors from the foreground/background shell engine and the
/// process-group primitive underneath it.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to spawn shell: {0}")]
    Spawn(#[from] io::Error),

    #[error("no usable shell found on this platform")]
    ShellNotFound,

    #[error("failed to attach process group: {0}")]
    ProcessGroupAttach(String),

    #[error("failed to kill process group: {0}")]
    ProcessGroupKill(String),

    #[error("unknown background job id: {0}")]
    UnknownJob(String),

    #[error("job {id} is not running (current status: {status})")]
    NotRunning { id: String, status: String },
}
