//! Viewer input forwarding to the running tool's stdin.

use agent_relay::models::event::OutputEvent;
use agent_relay::orchestrator::coordinator::RunRequest;
use agent_relay::AppError;
use serial_test::serial;

use super::test_helpers::{build_core, recv_event};

#[tokio::test]
#[serial]
async fn input_reaches_the_child_stdin() {
    let core = build_core();
    let mut sub = core.hub.subscribe("s-in");

    let script = r#"read line; printf 'got-%s\n' "$line""#;
    core.coordinator
        .start_run(&RunRequest {
            session_id: Some("s-in".into()),
            prompt: script.into(),
            work_dir: None,
        })
        .expect("run starts");

    core.coordinator
        .send_input("s-in", "hello")
        .await
        .expect("input forwarded");

    let _prompt = recv_event(&mut sub.rx, 5).await;
    let echoed = recv_event(&mut sub.rx, 10).await;
    assert_eq!(
        echoed,
        OutputEvent::Data {
            session_id: "s-in".into(),
            data: "got-hello".into(),
        }
    );
    assert!(matches!(
        recv_event(&mut sub.rx, 5).await,
        OutputEvent::Done { .. }
    ));
}

#[tokio::test]
#[serial]
async fn input_to_an_idle_session_is_not_found() {
    let core = build_core();
    let result = core.coordinator.send_input("never-ran", "hello").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
