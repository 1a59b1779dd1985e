//! Contract tests for the output event wire format consumed by the UI.

use agent_relay::models::event::OutputEvent;
use serde_json::json;

#[test]
fn data_event_shape() {
    let event = OutputEvent::Data {
        session_id: "s1".into(),
        data: r#"{"type":"assistant"}"#.into(),
    };
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        value,
        json!({"type": "data", "sessionId": "s1", "data": r#"{"type":"assistant"}"#})
    );
}

#[test]
fn diagnostic_event_shape() {
    let event = OutputEvent::Diagnostic {
        session_id: "s1".into(),
        message: "warning: model fallback".into(),
    };
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        value,
        json!({"type": "diagnostic", "sessionId": "s1", "message": "warning: model fallback"})
    );
}

#[test]
fn prompt_event_shape() {
    let event = OutputEvent::Prompt {
        session_id: "s1".into(),
        prompt: "hello".into(),
    };
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        value,
        json!({"type": "prompt", "sessionId": "s1", "prompt": "hello"})
    );
}

#[test]
fn done_event_shape() {
    let event = OutputEvent::Done {
        session_id: "s1".into(),
    };
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value, json!({"type": "done", "sessionId": "s1"}));
}

#[test]
fn error_event_shape() {
    let event = OutputEvent::Error {
        session_id: "s1".into(),
        message: "tool exited with code 2".into(),
    };
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        value,
        json!({"type": "error", "sessionId": "s1", "message": "tool exited with code 2"})
    );
}

#[test]
fn events_round_trip() {
    let events = [
        OutputEvent::Data {
            session_id: "s".into(),
            data: "x".into(),
        },
        OutputEvent::Done {
            session_id: "s".into(),
        },
    ];
    for event in events {
        let text = serde_json::to_string(&event).expect("serialize");
        let back: OutputEvent = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, event);
    }
}

#[test]
fn session_id_accessor_covers_all_variants() {
    let events = [
        OutputEvent::Data {
            session_id: "s1".into(),
            data: String::new(),
        },
        OutputEvent::Diagnostic {
            session_id: "s1".into(),
            message: String::new(),
        },
        OutputEvent::Prompt {
            session_id: "s1".into(),
            prompt: String::new(),
        },
        OutputEvent::Done {
            session_id: "s1".into(),
        },
        OutputEvent::Error {
            session_id: "s1".into(),
            message: String::new(),
        },
    ];
    for event in &events {
        assert_eq!(event.session_id(), "s1");
    }
}
