//! Session process orchestration.
//!
//! The concurrency core of the relay: the process registry (liveness
//! oracle), the session ledger (busy/idle truth with self-healing
//! reconciliation), the change broadcaster and output hub (bounded
//! fan-out to viewers), and the run coordinator that glues one chat
//! request's lifecycle together.

pub mod broadcaster;
pub mod coordinator;
pub mod hub;
pub mod ledger;
pub mod registry;
pub mod spawner;
pub mod sweeper;
