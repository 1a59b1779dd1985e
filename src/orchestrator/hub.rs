//! Per-session fan-out of run output to live subscribers.
//!
//! Each session with activity owns a `SessionStream`: the pending user
//! prompt, a replay backlog of stdout chunks, and the current
//! subscriber set. A subscriber that joins mid-run is synchronously
//! seeded with the prompt and the full backlog, in original order,
//! before it is added to the live set — so every subscriber observes
//! replay-then-live with nothing reordered or duplicated by the hub.
//!
//! The backlog is an ephemeral replay buffer scoped to one run, not a
//! transcript: it is cleared when the run completes, and durable
//! history stays in the external tool's own log.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::event::OutputEvent;

/// Receiving side of one output subscription.
#[derive(Debug)]
pub struct OutputSubscriber {
    /// Subscription identifier, used to unsubscribe explicitly.
    pub id: String,
    /// Bounded queue of output events.
    pub rx: mpsc::Receiver<OutputEvent>,
}

#[derive(Debug, Default)]
struct SessionStream {
    pending_prompt: Option<String>,
    chunks: Vec<String>,
    subscribers: HashMap<String, mpsc::Sender<OutputEvent>>,
}

impl SessionStream {
    fn is_empty(&self) -> bool {
        self.pending_prompt.is_none() && self.chunks.is_empty() && self.subscribers.is_empty()
    }
}

/// Per-session output fan-out with bounded replay backlogs.
#[derive(Debug)]
pub struct OutputHub {
    sessions: Mutex<HashMap<String, SessionStream>>,
    queue_depth: usize,
}

impl OutputHub {
    /// Create a hub whose subscriber queues hold `queue_depth` pending
    /// events each. The depth bounds the replayable backlog: chunks
    /// beyond it are dropped for the joining subscriber.
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            queue_depth,
        }
    }

    /// Subscribe to a session's output.
    ///
    /// The new subscriber's queue is seeded, under the hub lock, with
    /// the pending prompt (if any) followed by the accumulated backlog
    /// in original order; live events queue behind those.
    pub fn subscribe(&self, session_id: &str) -> OutputSubscriber {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let id = Uuid::new_v4().to_string();

        let mut sessions = self.lock();
        let stream = sessions.entry(session_id.to_owned()).or_default();

        let mut dropped = 0usize;
        if let Some(prompt) = &stream.pending_prompt {
            let event = OutputEvent::Prompt {
                session_id: session_id.to_owned(),
                prompt: prompt.clone(),
            };
            if tx.try_send(event).is_err() {
                dropped += 1;
            }
        }
        for chunk in &stream.chunks {
            let event = OutputEvent::Data {
                session_id: session_id.to_owned(),
                data: chunk.clone(),
            };
            if tx.try_send(event).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(session_id, dropped, "backlog exceeds subscriber queue, replay truncated");
        }

        debug!(session_id, subscriber = %id, total = stream.subscribers.len() + 1, "output subscribe");
        stream.subscribers.insert(id.clone(), tx);
        OutputSubscriber { id, rx }
    }

    /// Drop one subscriber from a session. Empty streams are removed.
    pub fn unsubscribe(&self, session_id: &str, subscriber_id: &str) {
        let mut sessions = self.lock();
        if let Some(stream) = sessions.get_mut(session_id) {
            stream.subscribers.remove(subscriber_id);
            if stream.is_empty() {
                sessions.remove(session_id);
            }
        }
    }

    /// Fan an event out to every subscriber of its session.
    ///
    /// `data` payloads are appended to the replay backlog; `diagnostic`
    /// and control events are live-only. A full subscriber queue drops
    /// the event for that subscriber alone; a closed one removes the
    /// subscriber. Publishing to a session with no stream is a silent
    /// no-op — trailing output from an interrupted process lands here
    /// after cleanup and must be discarded, not resurrected.
    pub fn publish(&self, event: &OutputEvent) {
        let session_id = event.session_id().to_owned();
        let mut sessions = self.lock();
        let Some(stream) = sessions.get_mut(&session_id) else {
            debug!(session_id, "publish to absent stream dropped");
            return;
        };

        if let OutputEvent::Data { data, .. } = event {
            stream.chunks.push(data.clone());
        }

        let mut dead = Vec::new();
        for (id, tx) in &stream.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(session_id, subscriber = %id, "subscriber queue full, output event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(id.clone());
                }
            }
        }
        for id in dead {
            stream.subscribers.remove(&id);
        }
    }

    /// Record the prompt that triggered the current run, creating the
    /// session stream if needed.
    pub fn set_pending_prompt(&self, session_id: &str, prompt: &str) {
        let mut sessions = self.lock();
        let stream = sessions.entry(session_id.to_owned()).or_default();
        stream.pending_prompt = Some(prompt.to_owned());
    }

    /// Forget the pending prompt.
    pub fn clear_pending_prompt(&self, session_id: &str) {
        let mut sessions = self.lock();
        if let Some(stream) = sessions.get_mut(session_id) {
            stream.pending_prompt = None;
            if stream.is_empty() {
                sessions.remove(session_id);
            }
        }
    }

    /// Drop the replay backlog once a run completes so it never
    /// outlives the run or masquerades as a transcript.
    pub fn clear_accumulated(&self, session_id: &str) {
        let mut sessions = self.lock();
        if let Some(stream) = sessions.get_mut(session_id) {
            stream.chunks.clear();
            if stream.is_empty() {
                sessions.remove(session_id);
            }
        }
    }

    /// Number of chunks currently held for a session.
    #[must_use]
    pub fn backlog_len(&self, session_id: &str) -> usize {
        self.lock()
            .get(session_id)
            .map_or(0, |stream| stream.chunks.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionStream>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
