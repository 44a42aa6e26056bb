//! Common types used throughout verkv.
//!
//! Type aliases give the raw integers that flow between the consensus log and
//! the state machine a semantic name.

use serde::{Deserialize, Serialize};

/// Position of a committed command in the consensus log.
///
/// Log ids start at 1 and are delivered in non-decreasing order. The same id
/// may be delivered more than once.
///
/// # Examples
///
/// ```
/// use verkv_common::LogId;
///
/// let last_applied: LogId = 100;
/// let next: LogId = last_applied + 1;
/// assert!(next > last_applied);
/// ```
pub type LogId = u64;

/// Per-key version used for last-writer-wins resolution.
///
/// A stored entry always carries the highest version accepted for its key.
/// Version 0 is reserved for the synthetic entry of an absent key.
pub type Version = u64;

/// What the state machine does when a command arrives with a log id lower
/// than one it has already applied.
///
/// In both cases nothing from the command is applied.
///
/// # Examples
///
/// ```
/// use verkv_common::OrderingPolicy;
///
/// assert_eq!(OrderingPolicy::default(), OrderingPolicy::Reject);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Return `Error::OutOfOrder` to the driver.
    #[default]
    Reject,
    /// Log a warning and report success.
    Ignore,
}
