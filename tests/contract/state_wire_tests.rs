//! Contract tests for ledger snapshot and process list wire formats.

use std::path::PathBuf;

use agent_relay::models::process::{ActiveProcessInfo, ProcessHandle};
use agent_relay::models::session::{LedgerSnapshot, SessionRecord};
use chrono::Utc;

#[test]
fn snapshot_serializes_sessions_and_version() {
    let snapshot = LedgerSnapshot::new(vec![SessionRecord {
        session_id: "s1".into(),
        busy: true,
        owner_process_id: Some(3),
    }]);
    let value = serde_json::to_value(&snapshot).expect("serialize");

    assert_eq!(value["sessions"][0]["sessionId"], "s1");
    assert_eq!(value["sessions"][0]["busy"], true);
    assert_eq!(value["sessions"][0]["ownerProcessId"], 3);
    assert!(value["version"].as_i64().expect("version") > 0);
}

#[test]
fn idle_owner_is_omitted_from_the_wire() {
    let record = SessionRecord {
        session_id: "s1".into(),
        busy: false,
        owner_process_id: None,
    };
    let value = serde_json::to_value(&record).expect("serialize");
    assert!(value.get("ownerProcessId").is_none());
}

#[test]
fn snapshot_version_is_millisecond_scale() {
    let snapshot = LedgerSnapshot::new(Vec::new());
    // Any timestamp after 2020 in milliseconds is > 1.5e12.
    assert!(snapshot.version > 1_500_000_000_000);
}

#[test]
fn active_process_info_shape() {
    let handle = ProcessHandle {
        local_id: 7,
        session_id: "s1".into(),
        work_dir: PathBuf::from("/tmp"),
        started_at: Utc::now(),
        pid: Some(123),
        stdin: None,
    };
    let info = ActiveProcessInfo::from(&handle);
    let value = serde_json::to_value(&info).expect("serialize");

    assert_eq!(value["processId"], 7);
    assert_eq!(value["sessionId"], "s1");
    assert_eq!(value["workDir"], "/tmp");
    assert!(value["startedAt"].is_string(), "RFC 3339 timestamp");
    assert!(value.get("pid").is_none(), "the kill handle never leaves the process");
}
