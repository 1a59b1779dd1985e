#![forbid(unsafe_code)]

//! `agent-relay` — web relay binary for a line-oriented agent CLI.
//!
//! Bootstraps configuration, wires the orchestrator core (registry,
//! ledger, broadcaster, hub, coordinator), and starts the HTTP/WS
//! transport plus the background reconcile sweeper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_relay::config::GlobalConfig;
use agent_relay::orchestrator::broadcaster::ChangeBroadcaster;
use agent_relay::orchestrator::coordinator::RunCoordinator;
use agent_relay::orchestrator::hub::OutputHub;
use agent_relay::orchestrator::ledger::SessionLedger;
use agent_relay::orchestrator::registry::ProcessRegistry;
use agent_relay::orchestrator::spawner::CliSpawner;
use agent_relay::orchestrator::sweeper::spawn_reconcile_sweeper;
use agent_relay::server::{self, ServerState};
use agent_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-relay", about = "Web relay for a line-oriented agent CLI", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port from the configuration file.
    #[arg(long)]
    port: Option<u16>,

    /// Override the default working directory for runs.
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-relay server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;

    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(work_dir) = args.work_dir {
        let canonical = work_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid work dir override: {err}")))?;
        config.default_work_dir = canonical;
    }

    let config = Arc::new(config);
    info!(
        tool = %config.tool.command,
        port = config.http_port,
        "configuration loaded"
    );

    // ── Build the orchestrator core ─────────────────────
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

    let ct = CancellationToken::new();

    // ── Start the background reconcile sweep ────────────
    let sweeper_handle = if config.stream.reconcile_sweep_seconds > 0 {
        Some(spawn_reconcile_sweeper(
            Arc::clone(&ledger),
            Duration::from_secs(config.stream.reconcile_sweep_seconds),
            ct.clone(),
        ))
    } else {
        info!("reconcile sweeper disabled");
        None
    };

    // ── Start the HTTP transport ────────────────────────
    let state = ServerState {
        config: Arc::clone(&config),
        coordinator,
        ledger,
        hub,
    };
    let server_ct = ct.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(state, server_ct).await {
            error!(%err, "http transport failed");
        }
    });

    info!("agent-relay ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = server_handle.await;
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }
    info!("agent-relay shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
