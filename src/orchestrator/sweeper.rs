//! Background ledger reconcile sweep.
//!
//! Belt-and-suspenders only: reconciliation on every state read is the
//! correctness mechanism, the sweep merely bounds staleness for idle
//! deployments with no readers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::orchestrator::ledger::SessionLedger;

/// Spawn a task that reconciles the ledger every `interval` until the
/// `CancellationToken` fires.
#[must_use]
pub fn spawn_reconcile_sweeper(
    ledger: Arc<SessionLedger>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("reconcile sweeper shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }

            ledger.reconcile();
        }
    })
}
