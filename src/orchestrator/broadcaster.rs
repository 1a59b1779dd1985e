//! Fan-out of ledger snapshots to passive viewers.
//!
//! Delivery is best-effort and non-blocking: each subscriber owns a
//! bounded queue, a full queue drops the update for that subscriber
//! only, and a closed receiver removes the subscriber. The publisher
//! never waits on subscriber I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::models::session::LedgerSnapshot;

/// Receiving side of one ledger subscription.
#[derive(Debug)]
pub struct LedgerSubscriber {
    /// Subscription identifier, used to unsubscribe explicitly.
    pub id: String,
    /// Bounded queue of snapshots.
    pub rx: mpsc::Receiver<LedgerSnapshot>,
}

/// Snapshot broadcaster with per-subscriber bounded queues.
#[derive(Debug)]
pub struct ChangeBroadcaster {
    subscribers: Mutex<HashMap<String, mpsc::Sender<LedgerSnapshot>>>,
    queue_depth: usize,
}

impl ChangeBroadcaster {
    /// Create a broadcaster whose subscriber queues hold `queue_depth`
    /// pending snapshots each.
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            queue_depth,
        }
    }

    /// Register a new subscriber, seeding its queue with `initial` so a
    /// freshly connected viewer is immediately consistent.
    pub fn subscribe_with(&self, initial: LedgerSnapshot) -> LedgerSubscriber {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        // The queue is empty and at least depth 1, so this cannot fail.
        let _ = tx.try_send(initial);

        let id = Uuid::new_v4().to_string();
        self.lock().insert(id.clone(), tx);
        LedgerSubscriber { id, rx }
    }

    /// Drop a subscriber. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Push a snapshot to every subscriber without blocking.
    pub fn publish(&self, snapshot: &LedgerSnapshot) {
        let mut dead = Vec::new();
        {
            let subscribers = self.lock();
            for (id, tx) in subscribers.iter() {
                match tx.try_send(snapshot.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(subscriber = %id, "subscriber queue full, ledger update dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(id.clone());
                    }
                }
            }
        }
        if !dead.is_empty() {
            let mut subscribers = self.lock();
            for id in dead {
                subscribers.remove(&id);
            }
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::Sender<LedgerSnapshot>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
