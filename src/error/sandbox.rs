/// Errors from the container sandbox runner.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("docker CLI not found or not runnable: {0}")]
    DockerUnavailable(String),

    #[error("docker {args} failed (exit {exit_code:?}): {stderr}")]
    DockerCommandFailed {
        args: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("sandbox container is not running")]
    ContainerNotRunning,

    #[error("could not parse docker label output: {0}")]
    InvalidLabel(String),
}
