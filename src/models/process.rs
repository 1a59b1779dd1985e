//! Process handle model for the registry.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::ChildStdin;
use tokio::sync::Mutex;

/// Handle to a live external CLI process tracked by the registry.
///
/// The `local_id` is registry-scoped and never reused. The `pid` is the
/// killable handle used by the interrupt path; the stdin writer (when
/// piped) lets a viewer forward input to the running tool.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    /// Monotonic registry-local identifier.
    pub local_id: u64,
    /// Session this process is running for.
    pub session_id: String,
    /// Working directory the process was spawned in.
    pub work_dir: PathBuf,
    /// Spawn timestamp.
    pub started_at: DateTime<Utc>,
    /// OS process id, when the runtime reports one.
    pub pid: Option<u32>,
    /// Shared writer to the process stdin, when piped.
    pub stdin: Option<Arc<Mutex<ChildStdin>>>,
}

/// Public view of an active process for API responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveProcessInfo {
    /// Registry-local process identifier.
    pub process_id: u64,
    /// Owning session.
    pub session_id: String,
    /// Working directory of the run.
    pub work_dir: PathBuf,
    /// Spawn timestamp.
    pub started_at: DateTime<Utc>,
}

impl From<&ProcessHandle> for ActiveProcessInfo {
    fn from(handle: &ProcessHandle) -> Self {
        Self {
            process_id: handle.local_id,
            session_id: handle.session_id.clone(),
            work_dir: handle.work_dir.clone(),
            started_at: handle.started_at,
        }
    }
}
