//! Error types for the verkv replicated key-value store.
//!
//! This module defines the common error type returned by the state machine,
//! the replica driver and their configuration. Uses `thiserror` for ergonomic
//! error handling.
//!
//! Corrupted stored data is deliberately absent here: it is not a recoverable
//! condition and never travels through this type.

use crate::types::LogId;
use thiserror::Error;

/// Common error type for verkv operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A command was delivered with a log id lower than one already applied.
    #[error("out of order apply: log id {log_id} < last applied {last_applied}")]
    OutOfOrder {
        /// The log id that was delivered.
        log_id: LogId,
        /// The highest log id applied so far.
        last_applied: LogId,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error at the transport boundary.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for Result with verkv Error.
pub type Result<T> = std::result::Result<T, Error>;
