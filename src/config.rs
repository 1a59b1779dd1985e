//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Nested configuration for the fronted CLI tool.
///
/// The relay never interprets the tool's output; it only assembles the
/// command line and streams whatever the tool prints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ToolConfig {
    /// CLI binary to spawn (e.g. `claude`).
    #[serde(default = "default_tool_command")]
    pub command: String,
    /// Arguments prepended to every invocation.
    #[serde(default = "default_base_args")]
    pub base_args: Vec<String>,
    /// Flag used to resume an existing tool session; the session id is
    /// appended as the following argument.
    #[serde(default = "default_resume_flag")]
    pub resume_flag: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: default_tool_command(),
            base_args: default_base_args(),
            resume_flag: default_resume_flag(),
        }
    }
}

fn default_tool_command() -> String {
    "claude".into()
}

fn default_base_args() -> Vec<String> {
    vec![
        "-p".into(),
        "--output-format".into(),
        "stream-json".into(),
        "--verbose".into(),
    ]
}

fn default_resume_flag() -> String {
    "--resume".into()
}

/// Streaming and fan-out tuning knobs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Per-subscriber queue depth for ledger snapshot updates.
    #[serde(default = "default_ledger_queue_depth")]
    pub ledger_queue_depth: usize,
    /// Per-subscriber queue depth for output events. Must be large
    /// enough to absorb a full backlog replay.
    #[serde(default = "default_output_queue_depth")]
    pub output_queue_depth: usize,
    /// Heartbeat interval for live transports, in seconds.
    #[serde(default = "default_heartbeat_seconds")]
    pub heartbeat_seconds: u64,
    /// Interval for the background ledger reconcile sweep, in seconds.
    /// Zero disables the sweep; reconciliation on reads is the
    /// correctness mechanism either way.
    #[serde(default = "default_reconcile_sweep_seconds")]
    pub reconcile_sweep_seconds: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ledger_queue_depth: default_ledger_queue_depth(),
            output_queue_depth: default_output_queue_depth(),
            heartbeat_seconds: default_heartbeat_seconds(),
            reconcile_sweep_seconds: default_reconcile_sweep_seconds(),
        }
    }
}

fn default_ledger_queue_depth() -> usize {
    10
}

fn default_output_queue_depth() -> usize {
    256
}

fn default_heartbeat_seconds() -> u64 {
    30
}

fn default_reconcile_sweep_seconds() -> u64 {
    30
}

fn default_http_port() -> u16 {
    43210
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Default working directory for runs that do not specify one.
    pub default_work_dir: PathBuf,
    /// HTTP port the relay listens on (loopback only).
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Fronted CLI tool settings.
    #[serde(default)]
    pub tool: ToolConfig,
    /// Streaming and fan-out settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Absolute path to the default working directory.
    #[must_use]
    pub fn default_work_dir(&self) -> &Path {
        &self.default_work_dir
    }

    fn validate(&mut self) -> Result<()> {
        if self.tool.command.is_empty() {
            return Err(AppError::Config("tool.command must not be empty".into()));
        }

        if self.stream.ledger_queue_depth == 0 || self.stream.output_queue_depth == 0 {
            return Err(AppError::Config(
                "stream queue depths must be greater than zero".into(),
            ));
        }

        if self.stream.heartbeat_seconds == 0 {
            return Err(AppError::Config(
                "stream.heartbeat_seconds must be greater than zero".into(),
            ));
        }

        let canonical = self
            .default_work_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("default_work_dir invalid: {err}")))?;
        self.default_work_dir = canonical;

        Ok(())
    }
}
