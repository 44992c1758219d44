//! Unix process groups: `setpgid`-at-spawn plus `killpg`/`kill -0`.
//!
//! Grounds on `examples/BinaryMuse-ouro/src/orchestration/background_proc.rs`'s
//! `process_group(0)` + `killpg(SIGKILL)` pattern, generalized into a
//! reusable handle rather than being inlined at the one background-process
//! call site.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::Command;

use crate::error::ShellError;

/// The process-group id of a spawned child, equal to the child's own pid
/// since we always call `process_group(0)` at spawn.
#[derive(Debug, Clone, Copy)]
pub struct ProcessGroupHandle {
    pgid: i32,
}

/// Configure `cmd` to start a new process group rooted at the child itself.
/// Must be called before `spawn()`.
pub fn attach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

/// Derive the handle for an already-spawned child from its pid. Infallible
/// on Unix (the pgid is just the pid), but returns `Result` to match the
/// Windows side's signature.
pub fn handle_for_pid(pid: u32) -> Result<ProcessGroupHandle, ShellError> {
    Ok(ProcessGroupHandle { pgid: pid as i32 })
}

/// Send `SIGKILL` to every process in the group.
pub fn kill(handle: ProcessGroupHandle) -> Result<(), ShellError> {
    signal::killpg(Pid::from_raw(handle.pgid), Signal::SIGKILL)
        .map_err(|e| ShellError::ProcessGroupKill(e.to_string()))
}

/// Probe whether `pid` is still alive via a signal-0 send.
pub fn is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[tokio::test]
    async fn kill_terminates_the_whole_process_group() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("sleep 30 & sleep 30 & wait")
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        attach(&mut cmd);
        let mut child = cmd.spawn().expect("spawn sh");
        let pid = child.id().expect("pid");
        let handle = handle_for_pid(pid).expect("handle");

        assert!(is_alive(pid));
        kill(handle).expect("kill group");

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("child reaped in time")
            .expect("wait succeeds");
        assert!(!status.success());
    }

    #[test]
    fn is_alive_is_false_for_a_pid_that_does_not_exist() {
        // PID 1 exists (init); pick an implausibly high pid instead.
        assert!(!is_alive(u32::MAX - 1));
    }
}
