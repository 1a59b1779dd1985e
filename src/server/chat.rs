//! REST endpoints for starting and interrupting runs.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::process::ActiveProcessInfo;
use crate::orchestrator::coordinator::RunRequest;
use crate::server::ServerState;
use crate::AppError;

/// Body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// User prompt.
    pub prompt: String,
    /// Existing tool session to resume.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Working directory override.
    #[serde(default)]
    pub work_dir: Option<String>,
}

/// Response for a successfully started run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStarted {
    /// Session key the run is tracked under.
    pub session_id: String,
    /// Registry id of the spawned process.
    pub process_id: u64,
}

/// Handler for `POST /api/chat` — start a run.
///
/// # Errors
///
/// `409` when the session is busy, `500` when the spawn fails.
pub async fn start_chat(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatStarted>, AppError> {
    let started = state.coordinator.start_run(&RunRequest {
        session_id: request.session_id,
        prompt: request.prompt,
        work_dir: request.work_dir,
    })?;
    Ok(Json(ChatStarted {
        session_id: started.session_id,
        process_id: started.process_id,
    }))
}

/// Query for `DELETE /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptQuery {
    /// Session whose run should be killed.
    pub session_id: String,
}

/// Acknowledgement body for an interrupt.
#[derive(Debug, Serialize)]
pub struct InterruptAck {
    /// Always true on the success path.
    pub success: bool,
}

/// Handler for `DELETE /api/chat` — interrupt a session's run.
///
/// # Errors
///
/// `404` when the session has no active run.
pub async fn interrupt_chat(
    State(state): State<ServerState>,
    Query(query): Query<InterruptQuery>,
) -> Result<Json<InterruptAck>, AppError> {
    state.coordinator.interrupt(&query.session_id)?;
    Ok(Json(InterruptAck { success: true }))
}

/// Response for `GET /api/processes`.
#[derive(Debug, Serialize)]
pub struct ProcessList {
    /// All currently running processes.
    pub processes: Vec<ActiveProcessInfo>,
}

/// Handler for `GET /api/processes` — list active processes.
pub async fn list_processes(State(state): State<ServerState>) -> Json<ProcessList> {
    Json(ProcessList {
        processes: state.coordinator.list_active(),
    })
}
