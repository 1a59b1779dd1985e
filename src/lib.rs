#![forbid(unsafe_code)]

//! `agent-relay` — fronts a line-oriented agent CLI with a multi-client
//! web UI. One OS process is spawned per chat request; its structured
//! output is fanned out to any number of live viewers, session busy
//! state is tracked in a self-healing ledger, and any viewer can
//! interrupt a running session.

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod workdir;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
