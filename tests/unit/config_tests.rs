//! Unit tests for configuration parsing, defaults, and validation.

use agent_relay::config::GlobalConfig;
use agent_relay::AppError;

fn minimal_toml(root: &str) -> String {
    format!("default_work_dir = '{root}'\n")
}

#[test]
fn minimal_config_applies_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config =
        GlobalConfig::from_toml_str(&minimal_toml(temp.path().to_str().expect("utf8")))
            .expect("valid config");

    assert_eq!(config.http_port, 43210);
    assert_eq!(config.tool.command, "claude");
    assert!(config
        .tool
        .base_args
        .iter()
        .any(|arg| arg == "stream-json"));
    assert_eq!(config.tool.resume_flag, "--resume");
    assert_eq!(config.stream.ledger_queue_depth, 10);
    assert_eq!(config.stream.output_queue_depth, 256);
    assert_eq!(config.stream.heartbeat_seconds, 30);
}

#[test]
fn work_dir_is_canonicalized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config =
        GlobalConfig::from_toml_str(&minimal_toml(temp.path().to_str().expect("utf8")))
            .expect("valid config");
    assert!(config.default_work_dir().is_absolute());
}

#[test]
fn missing_work_dir_fails_parse() {
    let result = GlobalConfig::from_toml_str("http_port = 8080\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn nonexistent_work_dir_fails_validation() {
    let result = GlobalConfig::from_toml_str("default_work_dir = '/no/such/dir/anywhere'\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn empty_tool_command_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "default_work_dir = '{}'\n[tool]\ncommand = \"\"\n",
        temp.path().to_str().expect("utf8")
    );
    let result = GlobalConfig::from_toml_str(&toml);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn zero_queue_depth_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "default_work_dir = '{}'\n[stream]\nledger_queue_depth = 0\n",
        temp.path().to_str().expect("utf8")
    );
    let result = GlobalConfig::from_toml_str(&toml);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn zero_heartbeat_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "default_work_dir = '{}'\n[stream]\nheartbeat_seconds = 0\n",
        temp.path().to_str().expect("utf8")
    );
    let result = GlobalConfig::from_toml_str(&toml);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn overrides_replace_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        r#"
default_work_dir = '{root}'
http_port = 9000

[tool]
command = "mytool"
base_args = ["--json"]
resume_flag = "--continue-session"

[stream]
ledger_queue_depth = 4
output_queue_depth = 32
heartbeat_seconds = 5
reconcile_sweep_seconds = 0
"#,
        root = temp.path().to_str().expect("utf8")
    );
    let config = GlobalConfig::from_toml_str(&toml).expect("valid config");

    assert_eq!(config.http_port, 9000);
    assert_eq!(config.tool.command, "mytool");
    assert_eq!(config.tool.base_args, vec!["--json".to_owned()]);
    assert_eq!(config.tool.resume_flag, "--continue-session");
    assert_eq!(config.stream.output_queue_depth, 32);
    assert_eq!(config.stream.reconcile_sweep_seconds, 0);
}
