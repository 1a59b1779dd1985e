//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::orchestrator::coordinator::RunCoordinator;
use crate::orchestrator::hub::OutputHub;
use crate::orchestrator::ledger::SessionLedger;

/// Cloneable bundle of the orchestrator components.
#[derive(Clone)]
pub struct ServerState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Run lifecycle orchestration.
    pub coordinator: Arc<RunCoordinator>,
    /// Session busy/idle ledger.
    pub ledger: Arc<SessionLedger>,
    /// Per-session output fan-out.
    pub hub: Arc<OutputHub>,
}
