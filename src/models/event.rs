//! Output events delivered to session subscribers.

use serde::{Deserialize, Serialize};

/// One event on a session's output stream.
///
/// `data` carries a raw stdout line from the tool, `diagnostic` a stderr
/// line; `prompt` echoes the user prompt that triggered the run so every
/// viewer renders the same conversation; `done` and `error` are the
/// terminal events of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutputEvent {
    /// A stdout line from the tool.
    #[serde(rename_all = "camelCase")]
    Data {
        /// Owning session.
        session_id: String,
        /// Raw line as printed by the tool.
        data: String,
    },
    /// A stderr line from the tool.
    #[serde(rename_all = "camelCase")]
    Diagnostic {
        /// Owning session.
        session_id: String,
        /// Raw stderr line.
        message: String,
    },
    /// Echo of the prompt that triggered the current run.
    #[serde(rename_all = "camelCase")]
    Prompt {
        /// Owning session.
        session_id: String,
        /// The user prompt.
        prompt: String,
    },
    /// The run finished normally (including interrupted runs).
    #[serde(rename_all = "camelCase")]
    Done {
        /// Owning session.
        session_id: String,
    },
    /// The run failed: unexpected exit code or a stream failure.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Owning session.
        session_id: String,
        /// Human-readable failure description.
        message: String,
    },
}

impl OutputEvent {
    /// Session this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Data { session_id, .. }
            | Self::Diagnostic { session_id, .. }
            | Self::Prompt { session_id, .. }
            | Self::Done { session_id }
            | Self::Error { session_id, .. } => session_id,
        }
    }
}
