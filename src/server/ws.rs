//! Interactive chat transport over WebSocket.
//!
//! One connection carries `{type, payload}` requests — `subscribe`,
//! `chat`, `interrupt`, `input` — and receives output events for every
//! session it subscribed to, plus `started`/`error` acknowledgements.
//! A dedicated write task drains the connection's bounded queue and
//! emits heartbeat pings; per-subscription forwarder tasks pump hub
//! queues into the connection and unsubscribe themselves when either
//! side goes away.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::orchestrator::coordinator::RunRequest;
use crate::orchestrator::hub::OutputHub;
use crate::server::ServerState;

/// Inbound client request frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
enum WsRequest {
    /// Watch a session's output stream.
    #[serde(rename_all = "camelCase")]
    Subscribe {
        session_id: String,
    },
    /// Start a run; the connection is auto-subscribed to the session.
    #[serde(rename_all = "camelCase")]
    Chat {
        prompt: String,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        work_dir: Option<String>,
    },
    /// Kill the session's running process.
    #[serde(rename_all = "camelCase")]
    Interrupt {
        session_id: String,
    },
    /// Forward a line to the running tool's stdin.
    #[serde(rename_all = "camelCase")]
    Input {
        session_id: String,
        input: String,
    },
}

/// Outbound acknowledgement frames (output events are sent as-is).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum WsReply {
    #[serde(rename_all = "camelCase")]
    Started {
        session_id: String,
        process_id: u64,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
    },
}

/// Handler for `GET /api/chat/ws` — upgrade to the chat WebSocket.
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(%err, "failed to encode outbound frame");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let (mut sink, mut inbound) = socket.split();
    let (conn_tx, mut conn_rx) =
        mpsc::channel::<String>(state.config.stream.output_queue_depth);
    let cancel = CancellationToken::new();
    let heartbeat = Duration::from_secs(state.config.stream.heartbeat_seconds);

    debug!("chat websocket connected");

    // Write loop: drain the connection queue, ping on the heartbeat.
    let write_cancel = cancel.clone();
    let write_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        loop {
            tokio::select! {
                () = write_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                text = conn_rx.recv() => match text {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    // Read loop.
    while let Some(frame) = inbound.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let request: WsRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(err) => {
                send_reply(
                    &conn_tx,
                    &WsReply::Error {
                        message: format!("invalid request: {err}"),
                    },
                )
                .await;
                continue;
            }
        };

        dispatch(&state, &conn_tx, request).await;
    }

    debug!("chat websocket disconnected");
    cancel.cancel();
    let _ = write_task.await;
    // Dropping conn_rx wakes every forwarder, which then unsubscribes.
}

async fn dispatch(state: &ServerState, conn_tx: &mpsc::Sender<String>, request: WsRequest) {
    match request {
        WsRequest::Subscribe { session_id } => {
            forward_session(Arc::clone(&state.hub), session_id, conn_tx.clone());
        }
        WsRequest::Chat {
            prompt,
            session_id,
            work_dir,
        } => {
            let result = state.coordinator.start_run(&RunRequest {
                session_id,
                prompt,
                work_dir,
            });
            match result {
                Ok(started) => {
                    forward_session(
                        Arc::clone(&state.hub),
                        started.session_id.clone(),
                        conn_tx.clone(),
                    );
                    send_reply(
                        conn_tx,
                        &WsReply::Started {
                            session_id: started.session_id,
                            process_id: started.process_id,
                        },
                    )
                    .await;
                }
                Err(err) => {
                    send_reply(
                        conn_tx,
                        &WsReply::Error {
                            message: err.to_string(),
                        },
                    )
                    .await;
                }
            }
        }
        WsRequest::Interrupt { session_id } => {
            if let Err(err) = state.coordinator.interrupt(&session_id) {
                send_reply(
                    conn_tx,
                    &WsReply::Error {
                        message: err.to_string(),
                    },
                )
                .await;
            }
        }
        WsRequest::Input { session_id, input } => {
            if let Err(err) = state.coordinator.send_input(&session_id, &input).await {
                send_reply(
                    conn_tx,
                    &WsReply::Error {
                        message: err.to_string(),
                    },
                )
                .await;
            }
        }
    }
}

async fn send_reply(conn_tx: &mpsc::Sender<String>, reply: &WsReply) {
    if let Some(text) = encode(reply) {
        let _ = conn_tx.send(text).await;
    }
}

/// Pump one hub subscription into the connection queue until either
/// side closes, then drop the subscription.
fn forward_session(hub: Arc<OutputHub>, session_id: String, conn_tx: mpsc::Sender<String>) {
    let subscriber = hub.subscribe(&session_id);
    tokio::spawn(async move {
        let mut rx = subscriber.rx;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        let Some(text) = encode(&event) else { continue };
                        if conn_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                () = conn_tx.closed() => break,
            }
        }
        hub.unsubscribe(&session_id, &subscriber.id);
    });
}
