//! Shared test helpers for orchestrator-level integration tests.
//!
//! Builds the full component stack against a fake tool script so tests
//! can drive real child processes: the script skips any `--resume`
//! pair and executes its final argument as shell code, which lets a
//! test's "prompt" double as the child's behavior.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agent_relay::config::GlobalConfig;
use agent_relay::models::event::OutputEvent;
use agent_relay::orchestrator::broadcaster::ChangeBroadcaster;
use agent_relay::orchestrator::coordinator::RunCoordinator;
use agent_relay::orchestrator::hub::OutputHub;
use agent_relay::orchestrator::ledger::SessionLedger;
use agent_relay::orchestrator::registry::ProcessRegistry;
use agent_relay::orchestrator::spawner::CliSpawner;
use tokio::sync::mpsc;

/// Full orchestrator stack wired against a scratch directory.
pub struct TestCore {
    pub config: Arc<GlobalConfig>,
    pub registry: Arc<ProcessRegistry>,
    pub ledger: Arc<SessionLedger>,
    pub hub: Arc<OutputHub>,
    pub coordinator: Arc<RunCoordinator>,
    // Keeps the scratch directory (and the fake tool) alive.
    pub temp: tempfile::TempDir,
}

/// Write the fake tool script into `dir` and make it executable.
pub fn write_fake_tool(dir: &Path) -> PathBuf {
    let path = dir.join("fake-tool.sh");
    let script = "#!/bin/sh\nwhile [ \"$1\" = \"--resume\" ]; do shift 2; done\nexec /bin/sh -c \"$1\"\n";
    std::fs::write(&path, script).expect("write fake tool");

    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake tool");
    path
}

/// Build the full stack around the fake tool.
pub fn build_core() -> TestCore {
    let temp = tempfile::tempdir().expect("tempdir");
    let tool = write_fake_tool(temp.path());
    build_core_with_tool(temp, tool.to_str().expect("utf8").to_owned())
}

/// Build the full stack around an arbitrary tool command.
pub fn build_core_with_tool(temp: tempfile::TempDir, tool: String) -> TestCore {
    let toml = format!(
        r#"
default_work_dir = '{root}'
http_port = 0

[tool]
command = '{tool}'
base_args = []

[stream]
ledger_queue_depth = 10
output_queue_depth = 64
heartbeat_seconds = 30
reconcile_sweep_seconds = 0
"#,
        root = temp.path().to_str().expect("utf8"),
    );
    let config = Arc::new(GlobalConfig::from_toml_str(&toml).expect("valid test config"));

    let registry = Arc::new(ProcessRegistry::new());
    let broadcaster = Arc::new(ChangeBroadcaster::new(config.stream.ledger_queue_depth));
    let ledger = Arc::new(SessionLedger::new(
        Arc::clone(&registry),
        Arc::clone(&broadcaster),
    ));
    let hub = Arc::new(OutputHub::new(config.stream.output_queue_depth));
    let coordinator = Arc::new(RunCoordinator::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        Arc::clone(&ledger),
        Arc::clone(&hub),
        Arc::new(CliSpawner),
    ));

    TestCore {
        config,
        registry,
        ledger,
        hub,
        coordinator,
        temp,
    }
}

/// Receive the next output event or panic after `secs`.
pub async fn recv_event(rx: &mut mpsc::Receiver<OutputEvent>, secs: u64) -> OutputEvent {
    tokio::time::timeout(Duration::from_secs(secs), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Poll until the ledger no longer tracks `session`, or panic after
/// `secs`.
pub async fn wait_for_idle(ledger: &SessionLedger, session: &str, secs: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
    while ledger.get(session).is_some() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session {session} never went idle"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
