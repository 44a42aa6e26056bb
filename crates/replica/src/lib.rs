//! Replica driver for the verkv replicated key-value store.
//!
//! This crate connects the deterministic [`verkv_kv::StateMachine`] to an
//! ordered source of committed commands. The consensus protocol behind that
//! source is external; it is injected through the [`CommandLog`] trait.

pub mod config;
pub mod command_log;
pub mod node;

// Re-export main types for convenience
pub use config::ReplicaConfig;
pub use command_log::{CommandLog, MemLog};
pub use node::ReplicaNode;
