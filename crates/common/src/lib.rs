//! Common types and utilities shared across verkv crates.
//!
//! This crate provides the error type, the log and version aliases, and the
//! ordering policy used by the replicated state machine and its driver.

pub mod errors;
pub mod types;

// Re-export commonly used types for convenience
pub use errors::{Error, Result};
pub use types::{LogId, OrderingPolicy, Version};
