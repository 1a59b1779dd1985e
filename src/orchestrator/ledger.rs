//! Authoritative busy/idle ledger per session.
//!
//! The ledger answers "is this session busy and with which process".
//! Its record of truth can drift when a process dies without a clean
//! completion callback (killed externally, crashed); `reconcile`
//! repairs that by cross-checking against the process registry. Lock
//! order is fixed: registry snapshot first, then the ledger lock —
//! never the reverse. Every broadcast happens after the ledger lock is
//! released, on a copied snapshot, so slow subscribers can never stall
//! a mutation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::models::session::{LedgerSnapshot, SessionRecord};
use crate::orchestrator::broadcaster::{ChangeBroadcaster, LedgerSubscriber};
use crate::orchestrator::registry::ProcessRegistry;

/// Lock-guarded session table with change notification.
#[derive(Debug)]
pub struct SessionLedger {
    registry: Arc<ProcessRegistry>,
    broadcaster: Arc<ChangeBroadcaster>,
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionLedger {
    /// Create an empty ledger backed by the given registry and
    /// broadcaster.
    #[must_use]
    pub fn new(registry: Arc<ProcessRegistry>, broadcaster: Arc<ChangeBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Current record for a session, if any.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.lock().get(session_id).cloned()
    }

    /// Mark a session busy with the given owning process.
    pub fn set_busy(&self, session_id: &str, process_id: u64) {
        let snapshot = {
            let mut records = self.lock();
            records.insert(
                session_id.to_owned(),
                SessionRecord {
                    session_id: session_id.to_owned(),
                    busy: true,
                    owner_process_id: Some(process_id),
                },
            );
            snapshot_of(&records)
        };
        info!(session_id, process_id, "session busy");
        self.broadcaster.publish(&snapshot);
    }

    /// Return a session to idle, dropping its record. Idempotent:
    /// setting idle on an unknown session changes nothing and fires no
    /// broadcast.
    pub fn set_idle(&self, session_id: &str) {
        let snapshot = {
            let mut records = self.lock();
            if records.remove(session_id).is_none() {
                return;
            }
            snapshot_of(&records)
        };
        info!(session_id, "session idle");
        self.broadcaster.publish(&snapshot);
    }

    /// Cross-check busy records against the live process registry and
    /// clear any whose owning process is gone.
    ///
    /// The registry snapshot is taken before the ledger lock is
    /// acquired (fixed lock order), and corrections are broadcast after
    /// the lock is released. Called on every read of current state so
    /// staleness is bounded by read frequency.
    pub fn reconcile(&self) -> LedgerSnapshot {
        let live: HashSet<u64> = self
            .registry
            .snapshot()
            .iter()
            .map(|handle| handle.local_id)
            .collect();

        let (snapshot, repaired) = {
            let mut records = self.lock();
            let before = records.len();
            records.retain(|session_id, record| {
                let owner_live = record
                    .owner_process_id
                    .is_some_and(|owner| live.contains(&owner));
                if record.busy && !owner_live {
                    info!(
                        session_id = %session_id,
                        owner = ?record.owner_process_id,
                        "reconcile: owner gone, clearing to idle"
                    );
                    return false;
                }
                true
            });
            (snapshot_of(&records), records.len() != before)
        };

        if repaired {
            self.broadcaster.publish(&snapshot);
        }
        snapshot
    }

    /// Subscribe to ledger changes, receiving a reconciled full
    /// snapshot as the first queued update.
    #[must_use]
    pub fn subscribe(&self) -> LedgerSubscriber {
        let snapshot = self.reconcile();
        self.broadcaster.subscribe_with(snapshot)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn snapshot_of(records: &HashMap<String, SessionRecord>) -> LedgerSnapshot {
    LedgerSnapshot::new(records.values().cloned().collect())
}
