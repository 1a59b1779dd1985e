//! Run lifecycle orchestration.
//!
//! One `start_run` call drives a run through `Idle → Starting → Running
//! → Completing → Idle`: single-flight guard against the ledger, spawn
//! through the collaborator interface, registration, output wiring into
//! the hub, and cleanup on exit. Interrupts race freely with natural
//! completion — unregister and `set_idle` are idempotent, so the first
//! finisher wins and the second is a no-op.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::models::event::OutputEvent;
use crate::models::process::{ActiveProcessInfo, ProcessHandle};
use crate::orchestrator::hub::OutputHub;
use crate::orchestrator::ledger::SessionLedger;
use crate::orchestrator::registry::ProcessRegistry;
use crate::orchestrator::spawner::{kill_process, ProcessSpawner, SpawnRequest};
use crate::{workdir, AppError, Result};

/// One chat run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Existing tool session to resume; a fresh session key is minted
    /// when absent.
    pub session_id: Option<String>,
    /// User prompt passed to the tool.
    pub prompt: String,
    /// Working directory override.
    pub work_dir: Option<String>,
}

/// Successful start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStarted {
    /// Session key the run is tracked under.
    pub session_id: String,
    /// Registry id of the spawned process.
    pub process_id: u64,
}

/// Orchestrates the lifecycle of chat runs against the shared
/// registry, ledger, and hub.
pub struct RunCoordinator {
    config: Arc<GlobalConfig>,
    registry: Arc<ProcessRegistry>,
    ledger: Arc<SessionLedger>,
    hub: Arc<OutputHub>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl RunCoordinator {
    /// Wire a coordinator to its collaborators.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        registry: Arc<ProcessRegistry>,
        ledger: Arc<SessionLedger>,
        hub: Arc<OutputHub>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            config,
            registry,
            ledger,
            hub,
            spawner,
        }
    }

    /// Start a run for a session.
    ///
    /// Rejects immediately when the ledger reports the session busy.
    /// The guard is a deliberate check-then-act: in the worst case two
    /// near-simultaneous requests both proceed, each with its own
    /// process id and registry entry — degraded but never corrupting.
    ///
    /// # Errors
    ///
    /// `AppError::Busy` when a run is already in flight for the
    /// session; `AppError::Spawn` when the working directory is invalid
    /// or the process cannot be started.
    pub fn start_run(&self, request: &RunRequest) -> Result<RunStarted> {
        let (session_id, resuming) = match &request.session_id {
            Some(id) if !id.is_empty() => (id.clone(), true),
            _ => (Uuid::new_v4().to_string(), false),
        };

        let work_dir = workdir::resolve(
            request.work_dir.as_deref(),
            self.config.default_work_dir(),
        )?;

        if self
            .ledger
            .get(&session_id)
            .is_some_and(|record| record.busy)
        {
            return Err(AppError::Busy(format!(
                "session {session_id} is already processing a request"
            )));
        }

        let mut args = self.config.tool.base_args.clone();
        if resuming {
            args.push(self.config.tool.resume_flag.clone());
            args.push(session_id.clone());
        }
        if !request.prompt.is_empty() {
            args.push(request.prompt.clone());
        }

        let spawned = self.spawner.spawn(&SpawnRequest {
            command: self.config.tool.command.clone(),
            args,
            work_dir: work_dir.clone(),
            env: Vec::new(),
        })?;

        let process_id = self.registry.next_id();
        self.registry.register(ProcessHandle {
            local_id: process_id,
            session_id: session_id.clone(),
            work_dir,
            started_at: Utc::now(),
            pid: spawned.pid,
            stdin: spawned.stdin.map(|stdin| Arc::new(Mutex::new(stdin))),
        });
        self.ledger.set_busy(&session_id, process_id);

        self.hub.set_pending_prompt(&session_id, &request.prompt);
        if !request.prompt.is_empty() {
            self.hub.publish(&OutputEvent::Prompt {
                session_id: session_id.clone(),
                prompt: request.prompt.clone(),
            });
        }

        let stdout_task = spawn_line_reader(
            Arc::clone(&self.hub),
            session_id.clone(),
            spawned.stdout,
            spawned.pid,
            LineKind::Data,
        );
        let stderr_task = spawn_line_reader(
            Arc::clone(&self.hub),
            session_id.clone(),
            spawned.stderr,
            spawned.pid,
            LineKind::Diagnostic,
        );

        self.spawn_completion_task(
            session_id.clone(),
            process_id,
            spawned.child,
            stdout_task,
            stderr_task,
        );

        info!(session_id, process_id, "run started");
        Ok(RunStarted {
            session_id,
            process_id,
        })
    }

    /// Interrupt the run currently owning a session.
    ///
    /// Looks up the owning process under the ledger/registry locks,
    /// releases them, delivers the kill signal outside any lock, then
    /// unregisters and idles the session without waiting for the
    /// process to actually die — trailing output is dropped by the hub.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` when the session has no live run.
    pub fn interrupt(&self, session_id: &str) -> Result<()> {
        let owner = self
            .ledger
            .get(session_id)
            .and_then(|record| record.owner_process_id)
            .ok_or_else(|| AppError::NotFound(format!("no active run for session {session_id}")))?;

        let Some(handle) = self.registry.get(owner) else {
            // Owner already gone: let reconciliation repair the record.
            self.ledger.reconcile();
            return Err(AppError::NotFound(format!(
                "no active run for session {session_id}"
            )));
        };

        if let Some(pid) = handle.pid {
            kill_process(pid);
        }

        self.registry.unregister(owner);
        self.ledger.set_idle(session_id);
        info!(session_id, process_id = owner, "run interrupted");
        Ok(())
    }

    /// Forward one line of viewer input to the running tool's stdin.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` when the session has no live run or its
    /// stdin was not piped; `AppError::Stream` when the write fails.
    pub async fn send_input(&self, session_id: &str, input: &str) -> Result<()> {
        let owner = self
            .ledger
            .get(session_id)
            .and_then(|record| record.owner_process_id)
            .ok_or_else(|| AppError::NotFound(format!("no active run for session {session_id}")))?;
        let stdin = self
            .registry
            .get(owner)
            .and_then(|handle| handle.stdin)
            .ok_or_else(|| {
                AppError::NotFound(format!("no writable stdin for session {session_id}"))
            })?;

        let mut guard = stdin.lock().await;
        guard
            .write_all(format!("{input}\n").as_bytes())
            .await
            .map_err(|err| AppError::Stream(format!("stdin write failed: {err}")))?;
        guard
            .flush()
            .await
            .map_err(|err| AppError::Stream(format!("stdin flush failed: {err}")))?;
        Ok(())
    }

    /// Public view of every currently running process.
    #[must_use]
    pub fn list_active(&self) -> Vec<ActiveProcessInfo> {
        let mut infos: Vec<ActiveProcessInfo> = self
            .registry
            .snapshot()
            .iter()
            .map(ActiveProcessInfo::from)
            .collect();
        infos.sort_by_key(|info| info.process_id);
        infos
    }

    fn spawn_completion_task(
        &self,
        session_id: String,
        process_id: u64,
        mut child: tokio::process::Child,
        stdout_task: JoinHandle<()>,
        stderr_task: JoinHandle<()>,
    ) {
        let registry = Arc::clone(&self.registry);
        let ledger = Arc::clone(&self.ledger);
        let hub = Arc::clone(&self.hub);

        tokio::spawn(async move {
            let status = child.wait().await;
            // Drain both pipes fully before the terminal event so no
            // subscriber sees `done` ahead of the final chunks.
            let _ = stdout_task.await;
            let _ = stderr_task.await;

            let terminal = match status {
                Ok(status) => interpret_exit(&session_id, status),
                Err(err) => OutputEvent::Error {
                    session_id: session_id.clone(),
                    message: format!("failed to wait for process: {err}"),
                },
            };
            hub.publish(&terminal);

            registry.unregister(process_id);
            ledger.set_idle(&session_id);
            hub.clear_pending_prompt(&session_id);
            hub.clear_accumulated(&session_id);
            info!(session_id, process_id, "run completed");
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum LineKind {
    Data,
    Diagnostic,
}

/// Exit codes treated as a normal end of run rather than a failure:
/// the tool's conventional interrupted-exit code, SIGINT, and SIGKILL.
const BENIGN_EXIT_CODES: [i32; 3] = [1, 130, 137];

fn interpret_exit(session_id: &str, status: std::process::ExitStatus) -> OutputEvent {
    let done = OutputEvent::Done {
        session_id: session_id.to_owned(),
    };
    if status.success() {
        return done;
    }
    match status.code() {
        // No code means signal-terminated; interrupts land here.
        None => done,
        Some(code) if BENIGN_EXIT_CODES.contains(&code) => done,
        Some(code) => OutputEvent::Error {
            session_id: session_id.to_owned(),
            message: format!("tool exited with code {code}"),
        },
    }
}

/// Drain one pipe line-by-line into the hub. One source line maps to
/// exactly one published event; empty lines are skipped. A read error
/// publishes a stream-failure event and kills the process so the run
/// force-completes through the normal cleanup path.
fn spawn_line_reader<R>(
    hub: Arc<OutputHub>,
    session_id: String,
    pipe: R,
    pid: Option<u32>,
    kind: LineKind,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    let event = match kind {
                        LineKind::Data => OutputEvent::Data {
                            session_id: session_id.clone(),
                            data: line,
                        },
                        LineKind::Diagnostic => OutputEvent::Diagnostic {
                            session_id: session_id.clone(),
                            message: line,
                        },
                    };
                    hub.publish(&event);
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(session_id, %err, "pipe read failed, forcing run completion");
                    hub.publish(&OutputEvent::Error {
                        session_id: session_id.clone(),
                        message: format!("error reading tool output: {err}"),
                    });
                    if let Some(pid) = pid {
                        kill_process(pid);
                    }
                    break;
                }
            }
        }
    })
}
