//! Replicated state machine applying committed commands.
//!
//! The state machine owns a typed `key -> Entry` table and applies each
//! command's entries with last-writer-wins on the entry version. Every
//! operation, read or write, runs as exactly one transaction of the backing
//! store, so readers never observe a partially applied command.
//!
//! Its state is a pure function of the ordered commands it has applied,
//! starting from an empty store.

use crate::command::Command;
use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use verkv_common::{Error, LogId, OrderingPolicy, Result};
use verkv_storage::{Codec, JsonCodec, MemStore, StringStore, TypedStore, TypedTxn};

type EntryTxn<'t, C> = TypedTxn<'t, String, Entry, C>;

/// Point-in-time copy of the state machine.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    last_applied: Option<LogId>,
    entries: Vec<Entry>,
}

/// What happened to one entry of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Stale,
    Written,
    Deleted,
}

/// Last-writer-wins key-value state machine.
///
/// `apply` must be driven by a single caller in log order; `get`, `keys` and
/// the other reads may run concurrently from any thread.
///
/// # Examples
///
/// ```
/// use verkv_kv::{make_command, Entry, StateMachine};
///
/// let sm = StateMachine::new();
/// sm.apply(1, &make_command(vec![Entry::new("a", "x", 4)])).unwrap();
///
/// // A lower version is ignored
/// sm.apply(2, &make_command(vec![Entry::new("a", "y", 3)])).unwrap();
/// assert_eq!(sm.get("a"), Entry::new("a", "x", 4));
///
/// // A higher-versioned tombstone deletes the key
/// sm.apply(3, &make_command(vec![Entry::tombstone("a", 5)])).unwrap();
/// assert_eq!(sm.get("a"), Entry::absent("a"));
/// assert!(sm.keys().is_empty());
/// ```
pub struct StateMachine<S = MemStore, C = JsonCodec> {
    /// The versioned table, keyed by entry key
    store: TypedStore<String, Entry, S, C>,
    /// What to do with a command whose log id went backwards
    policy: OrderingPolicy,
    /// Highest log id applied so far, only written under the store's
    /// exclusive access
    last_applied: Mutex<Option<LogId>>,
}

impl StateMachine {
    /// Creates an empty in-memory state machine that rejects out-of-order
    /// log ids.
    pub fn new() -> Self {
        Self::with_policy(OrderingPolicy::default())
    }

    /// Creates an empty in-memory state machine with the given ordering
    /// policy.
    pub fn with_policy(policy: OrderingPolicy) -> Self {
        Self::from_parts(MemStore::new(), JsonCodec, policy)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> StateMachine<S, C>
where
    S: StringStore,
    C: Codec,
{
    /// Creates a state machine that takes exclusive ownership of `store`.
    ///
    /// `store` is expected to be empty.
    pub fn from_parts(store: S, codec: C, policy: OrderingPolicy) -> Self {
        Self {
            store: TypedStore::new(store, codec),
            policy,
            last_applied: Mutex::new(None),
        }
    }

    /// The ordering policy this state machine was built with.
    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    /// Returns the stored entry for `key`, or [`Entry::absent`] if there is
    /// none.
    pub fn get(&self, key: &str) -> Entry {
        self.store.update(|txn| current_entry(txn, key))
    }

    /// Returns the entries for several keys, read under one transaction.
    ///
    /// The result is in the order of `keys`. No command is ever half-visible
    /// across the returned entries.
    pub fn get_many<I, Q>(&self, keys: I) -> Vec<Entry>
    where
        I: IntoIterator<Item = Q>,
        Q: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        self.store
            .update(|txn| keys.iter().map(|key| current_entry(txn, key)).collect())
    }

    /// Returns every key that has a stored entry. Order is unspecified.
    pub fn keys(&self) -> Vec<String> {
        self.store.update(|txn| txn.keys())
    }

    /// Number of keys with a stored entry.
    pub fn len(&self) -> usize {
        self.store.update(|txn| txn.keys().len())
    }

    /// Returns true if no key has a stored entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest log id applied so far, or `None` before the first apply.
    pub fn last_applied(&self) -> Option<LogId> {
        *self.last_applied_slot()
    }

    fn last_applied_slot(&self) -> MutexGuard<'_, Option<LogId>> {
        // The slot is assigned in one statement, so a poisoned lock still
        // holds a consistent value.
        self.last_applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `command`, committed at `log_id`, in one transaction.
    ///
    /// For each entry in order: an entry whose version is not above the
    /// stored version is discarded; otherwise an empty value deletes the key
    /// and any other value replaces the stored entry.
    ///
    /// Redelivering a log id that was already applied is accepted; the
    /// version rule turns it into a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfOrder` if `log_id` is lower than the last applied
    /// log id and the policy is [`OrderingPolicy::Reject`]. Under
    /// [`OrderingPolicy::Ignore`] such a command is dropped and `Ok(())` is
    /// returned. Either way nothing from the command is applied.
    ///
    /// # Panics
    ///
    /// Panics if a stored entry cannot be decoded; the transaction is
    /// abandoned before any of its writes land.
    pub fn apply(&self, log_id: LogId, command: &Command) -> Result<()> {
        self.store.update(|txn| {
            if let Some(last_applied) = self.last_applied().filter(|&last| log_id < last) {
                log::warn!(
                    "Dropping command {} at log id {} below last applied {} (policy: {:?})",
                    command.id(),
                    log_id,
                    last_applied,
                    self.policy
                );
                return match self.policy {
                    OrderingPolicy::Reject => Err(Error::OutOfOrder {
                        log_id,
                        last_applied,
                    }),
                    OrderingPolicy::Ignore => Ok(()),
                };
            }

            let mut written = 0usize;
            let mut deleted = 0usize;
            let mut stale = 0usize;
            for entry in command.entries() {
                match apply_entry(txn, entry) {
                    EntryOutcome::Written => written += 1,
                    EntryOutcome::Deleted => deleted += 1,
                    EntryOutcome::Stale => stale += 1,
                }
            }

            // Published under the store's exclusive access, so snapshots
            // always pair it with the table it describes.
            *self.last_applied_slot() = Some(log_id);

            log::debug!(
                "Applied command {} at log id {}: {} written, {} deleted, {} stale",
                command.id(),
                log_id,
                written,
                deleted,
                stale
            );
            Ok(())
        })
    }

    /// Serializes the whole table and the last applied log id with bincode.
    ///
    /// The snapshot is taken under one transaction.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = self.store.update(|txn| {
            let entries = txn
                .keys()
                .into_iter()
                .filter_map(|key| txn.get(&key))
                .collect();
            Snapshot {
                last_applied: self.last_applied(),
                entries,
            }
        });
        bincode::serialize(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Replaces the whole state with a snapshot produced by
    /// [`StateMachine::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if `data` is not a snapshot, and
    /// `Error::Storage` if the snapshot holds a tombstone or the same key
    /// twice. The current state is left untouched on error.
    pub fn restore(&self, data: &[u8]) -> Result<()> {
        let snapshot: Snapshot =
            bincode::deserialize(data).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut seen = std::collections::HashSet::with_capacity(snapshot.entries.len());
        for entry in &snapshot.entries {
            if entry.is_tombstone() {
                return Err(Error::Storage(format!(
                    "snapshot holds a tombstone for key {:?}",
                    entry.key
                )));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(Error::Storage(format!(
                    "snapshot holds key {:?} twice",
                    entry.key
                )));
            }
        }

        self.store.update(|txn| {
            for key in txn.keys() {
                txn.del(&key);
            }
            for entry in &snapshot.entries {
                txn.set(&entry.key, entry);
            }
            *self.last_applied_slot() = snapshot.last_applied;
        });

        log::debug!(
            "Restored {} entries at last applied {:?}",
            snapshot.entries.len(),
            snapshot.last_applied
        );
        Ok(())
    }
}

impl<S: StringStore, C: Codec> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("policy", &self.policy)
            .field("last_applied", &self.last_applied())
            .finish_non_exhaustive()
    }
}

fn current_entry<C: Codec>(txn: &EntryTxn<'_, C>, key: &str) -> Entry {
    txn.get(key).unwrap_or_else(|| Entry::absent(key))
}

fn apply_entry<C: Codec>(txn: &mut EntryTxn<'_, C>, entry: &Entry) -> EntryOutcome {
    let current = current_entry(txn, &entry.key);
    if entry.version <= current.version {
        log::trace!(
            "Ignoring stale entry for {:?}: version {} <= {}",
            entry.key,
            entry.version,
            current.version
        );
        return EntryOutcome::Stale;
    }

    if entry.is_tombstone() {
        log::trace!("Deleting {:?} at version {}", entry.key, entry.version);
        txn.del(&entry.key);
        EntryOutcome::Deleted
    } else {
        log::trace!("Writing {:?} at version {}", entry.key, entry.version);
        txn.set(&entry.key, entry);
        EntryOutcome::Written
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
