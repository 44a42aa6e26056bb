//! Ordered command source consumed by the replica.
//!
//! The consensus protocol itself lives outside this workspace. A replica only
//! needs two things from it: a way to submit a command and a way to read the
//! committed `(LogId, Command)` pairs in log order. [`CommandLog`] captures
//! exactly that, so the state machine can be driven by a real consensus
//! implementation or by the in-memory [`MemLog`] in tests.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use verkv_common::{Error, LogId, Result};
use verkv_kv::Command;

/// Committed, totally ordered log of commands.
///
/// Log ids strictly increase but may start at any value, 0 included.
pub trait CommandLog: Send + Sync {
    /// Submit `command` and return the log id it was committed at.
    fn append(&self, command: Command) -> Result<LogId>;

    /// Up to `limit` committed commands with a log id above `after` (or from
    /// the start when `after` is `None`), in increasing log id order.
    fn read_after(&self, after: Option<LogId>, limit: usize) -> Result<Vec<(LogId, Command)>>;

    /// Highest committed log id, if any.
    fn last_log_id(&self) -> Result<Option<LogId>>;
}

/// In-memory command log.
///
/// Every appended command is committed immediately. Clones share the same
/// log, which lets several replicas replay one history.
///
/// # Examples
///
/// ```
/// use verkv_kv::{make_command, Entry};
/// use verkv_replica::{CommandLog, MemLog};
///
/// let log = MemLog::new();
/// let id = log.append(make_command(vec![Entry::new("a", "x", 1)])).unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(log.read_after(None, 10).unwrap().len(), 1);
/// assert!(log.read_after(Some(1), 10).unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemLog {
    /// Committed commands indexed by log id
    entries: Arc<RwLock<BTreeMap<LogId, Command>>>,
}

impl MemLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of committed commands.
    ///
    /// Still counts after the lock was poisoned: `append` inserts in a single
    /// step, so the map is never left half-updated.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The command committed at `log_id`, if any.
    pub fn get(&self, log_id: LogId) -> Result<Option<Command>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&log_id).cloned())
    }
}

fn poisoned() -> Error {
    Error::Storage("command log lock poisoned".to_string())
}

impl CommandLog for MemLog {
    fn append(&self, command: Command) -> Result<LogId> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let log_id = entries.keys().next_back().map_or(1, |last| last + 1);
        entries.insert(log_id, command);
        Ok(log_id)
    }

    fn read_after(&self, after: Option<LogId>, limit: usize) -> Result<Vec<(LogId, Command)>> {
        let start = match after {
            None => 0,
            Some(log_id) => match log_id.checked_add(1) {
                Some(start) => start,
                None => return Ok(Vec::new()),
            },
        };

        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .range(start..)
            .take(limit)
            .map(|(log_id, command)| (*log_id, command.clone()))
            .collect())
    }

    fn last_log_id(&self) -> Result<Option<LogId>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().next_back().copied())
    }
}
