//! Registry of currently running external processes.
//!
//! The liveness oracle for everything above it: the ledger reconciles
//! against it, the interrupt path looks up kill handles in it, and the
//! `/api/processes` view lists it. A single lock guards both the id
//! counter and the map; no operation can fail, and removal is
//! idempotent so the completion and interrupt paths may race freely.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::models::process::ProcessHandle;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    processes: HashMap<u64, ProcessHandle>,
}

/// Lock-guarded table of live process handles keyed by local id.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    inner: Mutex<RegistryInner>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next process id. Strictly increasing, never reused.
    pub fn next_id(&self) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        inner.next_id
    }

    /// Track a newly spawned process.
    pub fn register(&self, handle: ProcessHandle) {
        let mut inner = self.lock();
        debug!(
            process_id = handle.local_id,
            session_id = %handle.session_id,
            "process registered"
        );
        inner.processes.insert(handle.local_id, handle);
    }

    /// Stop tracking a process. Removing an absent id is a no-op: the
    /// completion and interrupt paths both call this and the first
    /// remover wins.
    pub fn unregister(&self, id: u64) {
        let mut inner = self.lock();
        if inner.processes.remove(&id).is_some() {
            debug!(process_id = id, "process unregistered");
        }
    }

    /// Whether the given process id is still tracked.
    #[must_use]
    pub fn is_live(&self, id: u64) -> bool {
        self.lock().processes.contains_key(&id)
    }

    /// Look up a single handle by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<ProcessHandle> {
        self.lock().processes.get(&id).cloned()
    }

    /// Point-in-time copy of all tracked handles. Callers never iterate
    /// the live map.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProcessHandle> {
        self.lock().processes.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
