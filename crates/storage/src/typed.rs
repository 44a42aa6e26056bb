//! Typed transactional view over a string store.
//!
//! [`TypedStore`] pairs a backing [`StringStore`] with a [`Codec`] and hands
//! callers a [`TypedTxn`] whose `get`/`set`/`del` speak the caller's key and
//! value types. Every call to [`TypedStore::update`] is exactly one backing
//! transaction; the adapter adds no locking of its own.
//!
//! A record that cannot be encoded or decoded means the stored state no longer
//! matches the schema. That is never reported as a normal result: the adapter
//! logs a [`CorruptionError`] and panics, aborting the transaction before any
//! of its writes are committed.

use crate::backend::{StringStore, StringTxn};
use crate::codec::{Codec, CodecError, JsonCodec};
use crate::memory::MemStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Unrecoverable mismatch between stored data and the expected types.
#[derive(Error, Debug)]
#[error("store corruption while {context}: {source}")]
pub struct CorruptionError {
    /// What the adapter was doing when the codec failed.
    pub context: String,
    /// The underlying codec failure.
    #[source]
    pub source: CodecError,
}

#[cold]
fn corrupted(context: String, source: CodecError) -> ! {
    let err = CorruptionError { context, source };
    log::error!("{err}");
    panic!("{err}");
}

/// Typed key-value store over a string-keyed backing store.
///
/// # Examples
///
/// ```
/// use verkv_storage::{JsonCodec, MemStore, TypedStore};
///
/// let store: TypedStore<u32, Vec<String>> = TypedStore::new(MemStore::new(), JsonCodec);
/// store.update(|txn| {
///     txn.set(&1, &vec!["a".to_string()]);
///     txn.set(&2, &vec![]);
/// });
/// assert_eq!(store.update(|txn| txn.keys()), vec![1, 2]);
/// ```
pub struct TypedStore<K, V, S = MemStore, C = JsonCodec> {
    store: S,
    codec: C,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> TypedStore<K, V, MemStore, JsonCodec> {
    /// Creates a typed store over a fresh in-memory backing store.
    pub fn in_memory() -> Self {
        Self::new(MemStore::new(), JsonCodec)
    }
}

impl<K, V, S, C> TypedStore<K, V, S, C> {
    /// Wraps `store`, encoding records with `codec`.
    pub fn new(store: S, codec: C) -> Self {
        Self {
            store,
            codec,
            _marker: PhantomData,
        }
    }
}

impl<K, V, S, C> TypedStore<K, V, S, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: StringStore,
    C: Codec,
{
    /// Opens one backing transaction, runs `f` on a typed view of it and
    /// returns `f`'s result unmodified.
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut TypedTxn<'_, K, V, C>) -> R,
    {
        self.store.update(|txn| {
            let mut typed = TypedTxn {
                txn,
                codec: &self.codec,
                _marker: PhantomData,
            };
            f(&mut typed)
        })
    }
}

impl<K, V, S: fmt::Debug, C: fmt::Debug> fmt::Debug for TypedStore<K, V, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStore")
            .field("store", &self.store)
            .field("codec", &self.codec)
            .finish()
    }
}

impl<K, V, S: Default, C: Default> Default for TypedStore<K, V, S, C> {
    fn default() -> Self {
        Self::new(S::default(), C::default())
    }
}

/// Typed view of one backing transaction.
pub struct TypedTxn<'a, K, V, C> {
    txn: &'a mut dyn StringTxn,
    codec: &'a C,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> TypedTxn<'_, K, V, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    /// Returns the value stored under `key`, or `None` if there is no record.
    ///
    /// `key` may be any borrowed form of `K` that serializes exactly like
    /// `K`, such as `&str` for `String` keys.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Serialize + ?Sized,
    {
        let raw_key = self.encode_key(key);
        let raw = self.txn.get(&raw_key)?;
        match self.codec.decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => corrupted(format!("decoding value at {raw_key}"), e),
        }
    }

    /// Stores `value` under `key`.
    pub fn set(&mut self, key: &K, value: &V) {
        let raw_key = self.encode_key(key);
        let raw = match self.codec.encode(value) {
            Ok(raw) => raw,
            Err(e) => corrupted(format!("encoding value for {raw_key}"), e),
        };
        self.txn.set(raw_key, raw);
    }

    /// Removes any record stored under `key`.
    pub fn del<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Serialize + ?Sized,
    {
        let raw_key = self.encode_key(key);
        self.txn.del(&raw_key);
    }

    /// Returns true if a record is stored under `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Serialize + ?Sized,
    {
        self.txn.get(&self.encode_key(key)).is_some()
    }

    /// Every key visible to this transaction, in backing-store order.
    pub fn keys(&self) -> Vec<K> {
        self.txn
            .keys()
            .iter()
            .map(|raw_key| match self.codec.decode(raw_key) {
                Ok(key) => key,
                Err(e) => corrupted(format!("decoding key {raw_key}"), e),
            })
            .collect()
    }

    fn encode_key<Q: Serialize + ?Sized>(&self, key: &Q) -> String {
        match self.codec.encode(key) {
            Ok(raw_key) => raw_key,
            Err(e) => corrupted("encoding key".to_string(), e),
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        label: String,
        weight: u64,
        parts: Vec<(u32, bool)>,
    }

    fn arb_item() -> impl Strategy<Value = Item> {
        (
            ".*",
            any::<u64>(),
            prop::collection::vec((any::<u32>(), any::<bool>()), 0..8),
        )
            .prop_map(|(label, weight, parts)| Item {
                label,
                weight,
                parts,
            })
    }

    proptest! {
        #[test]
        fn prop_set_then_get_returns_value(key in ".*", item in arb_item()) {
            let store: TypedStore<String, Item> = TypedStore::in_memory();
            store.update(|txn| txn.set(&key, &item));

            let found = store.update(|txn| txn.get(&key));
            prop_assert_eq!(found, Some(item));
        }

        #[test]
        fn prop_tuple_keys_round_trip(keys in prop::collection::btree_set((any::<i64>(), ".{0,8}"), 0..16)) {
            let store: TypedStore<(i64, String), u8> = TypedStore::in_memory();
            store.update(|txn| {
                for key in &keys {
                    txn.set(key, &0);
                }
            });

            let mut stored = store.update(|txn| txn.keys());
            stored.sort();
            let expected: Vec<_> = keys.into_iter().collect();
            prop_assert_eq!(stored, expected);
        }

        #[test]
        fn prop_del_after_set_leaves_nothing(key in any::<u64>(), value in ".*") {
            let store: TypedStore<u64, String> = TypedStore::in_memory();
            store.update(|txn| {
                txn.set(&key, &value);
                txn.del(&key);
            });

            prop_assert_eq!(store.update(|txn| txn.get(&key)), None);
            prop_assert!(store.update(|txn| txn.keys()).is_empty());
        }
    }
}
