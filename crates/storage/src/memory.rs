//! In-memory backing store.
//!
//! `MemStore` keeps its table in a `BTreeMap` behind a single `Mutex`, which
//! serializes every `update` call. Writes made through a transaction are
//! buffered and only reach the table once the closure returns, so a closure
//! that panics leaves the table exactly as it found it.

use crate::backend::{StringStore, StringTxn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

/// In-memory string store.
///
/// # Examples
///
/// ```
/// use verkv_storage::{MemStore, StringStore};
///
/// let store = MemStore::new();
/// store.update(|txn| txn.set("a".to_string(), "1".to_string()));
/// assert_eq!(store.update(|txn| txn.get("a")), Some("1".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemStore {
    data: Mutex<BTreeMap<String, String>>,
}

impl MemStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of records currently committed.
    pub fn len(&self) -> usize {
        self.update(|txn| txn.keys().len())
    }

    /// Returns true if no record is committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transaction over a locked `MemStore` table.
///
/// `pending` maps a key to `Some(value)` for a buffered set and `None` for a
/// buffered delete.
struct MemTxn<'a> {
    committed: &'a BTreeMap<String, String>,
    pending: BTreeMap<String, Option<String>>,
}

impl StringTxn for MemTxn<'_> {
    fn get(&self, key: &str) -> Option<String> {
        match self.pending.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.committed.get(key).cloned(),
        }
    }

    fn set(&mut self, key: String, value: String) {
        self.pending.insert(key, Some(value));
    }

    fn del(&mut self, key: &str) {
        self.pending.insert(key.to_string(), None);
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<&String> = self
            .committed
            .keys()
            .filter(|key| !matches!(self.pending.get(*key), Some(None)))
            .collect();
        keys.extend(
            self.pending
                .iter()
                .filter(|(_, value)| value.is_some())
                .map(|(key, _)| key),
        );
        keys.into_iter().cloned().collect()
    }
}

impl StringStore for MemStore {
    fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut dyn StringTxn) -> R,
    {
        // A poisoned lock only means an earlier closure panicked; its writes
        // were never committed, so the table is still consistent.
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);

        let mut txn = MemTxn {
            committed: &*data,
            pending: BTreeMap::new(),
        };
        let out = f(&mut txn);
        let MemTxn { pending, .. } = txn;

        for (key, value) in pending {
            match value {
                Some(value) => {
                    data.insert(key, value);
                }
                None => {
                    data.remove(&key);
                }
            }
        }

        out
    }
}
