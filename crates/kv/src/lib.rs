//! Key-value state machine for the verkv replicated store
//!
//! This crate holds the replicated data model and the deterministic state
//! machine that applies committed commands to it.
//!
//! # Architecture
//!
//! - **Entry**: one versioned record (`key`, `val`, `ver`); an empty value is
//!   a tombstone
//! - **Command**: an idempotency-tagged batch of entries, delivered by the
//!   consensus log
//! - **StateMachine**: applies commands with last-writer-wins per key on top
//!   of a [`verkv_storage::TypedStore`]
//!
//! # Example
//!
//! ```rust
//! use verkv_kv::{make_command, Entry, StateMachine};
//!
//! let sm = StateMachine::new();
//! let cmd = make_command(vec![Entry::new("foo", "bar", 1)]);
//! sm.apply(1, &cmd).unwrap();
//! assert_eq!(sm.get("foo"), Entry::new("foo", "bar", 1));
//! assert_eq!(sm.keys(), vec!["foo".to_string()]);
//! ```

pub mod command;
pub mod entry;
pub mod state_machine;

// Re-export commonly used types for convenience
pub use command::{make_command, Command};
pub use entry::Entry;
pub use state_machine::StateMachine;
