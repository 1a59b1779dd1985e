//! External process spawning boundary.
//!
//! The coordinator consumes this purely as an opaque process
//! abstraction: piped stdio plus a waitable, killable child. The
//! production implementation shells out to the configured CLI binary
//! with `kill_on_drop(true)` so a crashed relay never leaks children.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{info, warn};

use crate::{AppError, Result};

/// Fully assembled spawn invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Binary to execute.
    pub command: String,
    /// Complete argument list.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub work_dir: PathBuf,
    /// Extra environment variables, on top of the inherited ones.
    pub env: Vec<(String, String)>,
}

/// A freshly spawned external process with its pipes split out.
#[derive(Debug)]
pub struct SpawnedProcess {
    /// OS process id, when the runtime reports one.
    pub pid: Option<u32>,
    /// Line-oriented structured output.
    pub stdout: ChildStdout,
    /// Diagnostic output.
    pub stderr: ChildStderr,
    /// Writer for forwarding viewer input.
    pub stdin: Option<ChildStdin>,
    /// Waitable child handle.
    pub child: Child,
}

/// Collaborator interface for starting external processes.
pub trait ProcessSpawner: Send + Sync {
    /// Start the process described by `request`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the OS refuses to start the process
    /// or a stdio pipe cannot be obtained.
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess>;
}

/// Spawner backed by `tokio::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliSpawner;

impl ProcessSpawner for CliSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess> {
        let mut cmd = Command::new(&request.command);
        cmd.args(&request.args)
            .current_dir(&request.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|err| {
            AppError::Spawn(format!("failed to spawn {}: {err}", request.command))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Spawn("child stdout pipe missing".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Spawn("child stderr pipe missing".into()))?;
        let stdin = child.stdin.take();

        info!(
            command = %request.command,
            pid = child.id().unwrap_or(0),
            work_dir = %request.work_dir.display(),
            "external process spawned"
        );

        Ok(SpawnedProcess {
            pid: child.id(),
            stdout,
            stderr,
            stdin,
            child,
        })
    }
}

/// Deliver a kill signal to a process by pid.
///
/// Best-effort by design: the target may already have exited, in which
/// case the failure is logged and ignored. Must never be called while
/// holding a registry or ledger lock.
#[cfg(unix)]
pub fn kill_process(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let target = Pid::from_raw(i32::try_from(pid).unwrap_or(0));
    if target.as_raw() == 0 {
        warn!(pid, "pid out of range, kill skipped");
        return;
    }
    match kill(target, Signal::SIGKILL) {
        Ok(()) => info!(pid, "kill signal delivered"),
        Err(err) => warn!(pid, %err, "kill signal failed (process likely already exited)"),
    }
}

/// Deliver a kill signal to a process by pid.
#[cfg(not(unix))]
pub fn kill_process(pid: u32) {
    warn!(pid, "process interruption is not supported on this platform");
}
