//! HTTP/WebSocket surface of the relay.
//!
//! Thin transports over the orchestrator core: REST for starting and
//! interrupting runs, Server-Sent Events for the passive ledger and
//! output feeds, and a WebSocket for interactive chat. All endpoints
//! bind on loopback only.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{AppError, Result};

pub mod chat;
pub mod state;
pub mod stream;
pub mod ws;

pub use state::ServerState;

/// JSON error body returned by failing endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Busy(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Spawn(_) | Self::Stream(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

/// Assemble the full application router.
#[must_use]
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/chat",
            axum::routing::post(chat::start_chat).delete(chat::interrupt_chat),
        )
        .route("/api/processes", get(chat::list_processes))
        .route("/api/state", get(stream::get_state))
        .route("/api/state/subscribe", get(stream::subscribe_state))
        .route("/api/chat/stream", get(stream::subscribe_output))
        .route("/api/chat/ws", get(ws::chat_ws))
        .with_state(state)
}

/// Start the HTTP transport on `config.http_port` (loopback only).
///
/// # Errors
///
/// Returns `AppError::Config` if the listener fails to bind, or
/// `AppError::Io` if serving fails.
pub async fn serve(state: ServerState, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], state.config.http_port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind on {bind}: {err}")))?;
    serve_with_listener(listener, state, ct).await
}

/// Serve on an already-bound listener. Split out so tests can bind an
/// ephemeral port first.
///
/// # Errors
///
/// Returns `AppError::Io` if the server loop fails.
pub async fn serve_with_listener(
    listener: tokio::net::TcpListener,
    state: ServerState,
    ct: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting HTTP transport");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Io(format!("server error: {err}")))?;

    info!("HTTP transport shut down");
    Ok(())
}
