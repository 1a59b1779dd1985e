//! Session ledger records and snapshots.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Busy/idle record for one session.
///
/// Records exist only while interesting: they are created when a run
/// starts and deleted once the session returns to idle, so the ledger is
/// bounded by the number of active sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Opaque session identifier.
    pub session_id: String,
    /// Whether a run is currently in flight.
    pub busy: bool,
    /// Registry id of the owning process while busy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_process_id: Option<u64>,
}

/// Point-in-time copy of the whole ledger, pushed to passive viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    /// All currently tracked session records, ordered by session id.
    pub sessions: Vec<SessionRecord>,
    /// Millisecond timestamp stamped at snapshot time; viewers use it to
    /// discard stale updates delivered out of order across transports.
    pub version: i64,
}

impl LedgerSnapshot {
    /// Build a snapshot stamped with the current time.
    #[must_use]
    pub fn new(mut sessions: Vec<SessionRecord>) -> Self {
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Self {
            sessions,
            version: Utc::now().timestamp_millis(),
        }
    }
}
