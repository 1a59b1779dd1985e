//! HTTP endpoint tests against a live listener on an ephemeral port.

use std::sync::Arc;

use agent_relay::server::{serve_with_listener, ServerState};
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{build_core, TestCore};

async fn start_server(core: &TestCore) -> (String, CancellationToken) {
    let state = ServerState {
        config: Arc::clone(&core.config),
        coordinator: Arc::clone(&core.coordinator),
        ledger: Arc::clone(&core.ledger),
        hub: Arc::clone(&core.hub),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let ct = CancellationToken::new();
    // The task is detached; the handle is not needed to keep it alive.
    drop(tokio::spawn(serve_with_listener(listener, state, ct.clone())));
    (format!("http://{addr}"), ct)
}

#[tokio::test]
#[serial]
async fn health_returns_ok() {
    let core = build_core();
    let (base, ct) = start_server(&core).await;

    let body = reqwest::get(format!("{base}/health"))
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "ok");

    ct.cancel();
}

#[tokio::test]
#[serial]
async fn state_endpoint_returns_a_reconciled_snapshot() {
    let core = build_core();
    let (base, ct) = start_server(&core).await;

    let value: serde_json::Value = reqwest::get(format!("{base}/api/state"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert!(value["sessions"].as_array().expect("sessions").is_empty());
    assert!(value["version"].as_i64().is_some());

    ct.cancel();
}

#[tokio::test]
#[serial]
async fn chat_lifecycle_over_http() {
    let core = build_core();
    let (base, ct) = start_server(&core).await;
    let client = reqwest::Client::new();

    // Start a long run.
    let started = client
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({"prompt": "sleep 30", "sessionId": "s-http"}))
        .send()
        .await
        .expect("start request");
    assert_eq!(started.status(), 200);
    let body: serde_json::Value = started.json().await.expect("json");
    assert_eq!(body["sessionId"], "s-http");
    assert!(body["processId"].as_u64().expect("process id") > 0);

    // Single-flight: an immediate second start is rejected.
    let rejected = client
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({"prompt": "true", "sessionId": "s-http"}))
        .send()
        .await
        .expect("second request");
    assert_eq!(rejected.status(), 409);

    // The process shows up in the listing.
    let processes: serde_json::Value = client
        .get(format!("{base}/api/processes"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("json");
    assert_eq!(processes["processes"].as_array().expect("list").len(), 1);

    // Interrupt, then a repeat interrupt is a 404.
    let interrupted = client
        .delete(format!("{base}/api/chat?sessionId=s-http"))
        .send()
        .await
        .expect("interrupt request");
    assert_eq!(interrupted.status(), 200);

    let missing = client
        .delete(format!("{base}/api/chat?sessionId=s-http"))
        .send()
        .await
        .expect("repeat interrupt");
    assert_eq!(missing.status(), 404);

    ct.cancel();
}

#[tokio::test]
#[serial]
async fn state_subscribe_delivers_an_initial_snapshot() {
    let core = build_core();
    let (base, ct) = start_server(&core).await;

    let mut response = reqwest::get(format!("{base}/api/state/subscribe"))
        .await
        .expect("subscribe request");
    assert_eq!(response.status(), 200);

    let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), response.chunk())
        .await
        .expect("first event in time")
        .expect("chunk read")
        .expect("stream open");
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("sessions"), "initial snapshot delivered: {text}");

    ct.cancel();
}
