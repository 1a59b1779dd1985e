//! Server-Sent Events feeds: ledger snapshots and session output.
//!
//! Both feeds drain a bounded subscriber queue into the SSE body and
//! rely on axum's keep-alive comments as the per-connection heartbeat.
//! A disconnected client drops its receiver; the publisher notices the
//! closed queue on the next send and prunes the subscription.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::models::session::LedgerSnapshot;
use crate::server::ServerState;

fn json_event<T: Serialize>(value: &T) -> Event {
    match Event::default().json_data(value) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "failed to serialize SSE event");
            Event::default().comment("serialization failed")
        }
    }
}

fn drain_queue<T: Serialize + Send + 'static>(
    rx: mpsc::Receiver<T>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((Ok(json_event(&item)), rx))
    })
}

/// Handler for `GET /api/state` — reconciled ledger snapshot.
pub async fn get_state(State(state): State<ServerState>) -> Json<LedgerSnapshot> {
    Json(state.ledger.reconcile())
}

/// Handler for `GET /api/state/subscribe` — live ledger snapshot feed.
///
/// The first event is always a full, freshly reconciled snapshot so a
/// newly connected viewer is immediately consistent.
pub async fn subscribe_state(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscriber = state.ledger.subscribe();
    let heartbeat = Duration::from_secs(state.config.stream.heartbeat_seconds);
    Sse::new(drain_queue(subscriber.rx))
        .keep_alive(KeepAlive::new().interval(heartbeat).text("heartbeat"))
}

/// Query for `GET /api/chat/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputQuery {
    /// Session to watch.
    pub session_id: String,
}

/// Handler for `GET /api/chat/stream` — live output feed for one
/// session, starting with the replayed backlog.
pub async fn subscribe_output(
    State(state): State<ServerState>,
    Query(query): Query<OutputQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscriber = state.hub.subscribe(&query.session_id);
    let heartbeat = Duration::from_secs(state.config.stream.heartbeat_seconds);
    Sse::new(drain_queue(subscriber.rx))
        .keep_alive(KeepAlive::new().interval(heartbeat).text("heartbeat"))
}
