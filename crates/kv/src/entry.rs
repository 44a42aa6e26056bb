//! Versioned entry, the unit of replicated data.

use serde::{Deserialize, Serialize};
use verkv_common::Version;

/// One versioned key-value record.
///
/// On the wire an entry is `{"key": .., "val": .., "ver": ..}`. An empty
/// value is the tombstone sentinel: applying it deletes the key. Tombstones
/// are never stored; an absent key reads back as [`Entry::absent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// The key this entry updates.
    pub key: String,
    /// The new value, or empty to delete the key.
    #[serde(rename = "val")]
    pub value: String,
    /// Version used for last-writer-wins resolution.
    #[serde(rename = "ver")]
    pub version: Version,
}

impl Entry {
    /// Create an entry setting `key` to `value` at `version`.
    pub fn new(key: impl Into<String>, value: impl Into<String>, version: Version) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            version,
        }
    }

    /// Create an entry deleting `key` at `version`.
    pub fn tombstone(key: impl Into<String>, version: Version) -> Self {
        Self::new(key, String::new(), version)
    }

    /// The synthetic entry reported for a key with no stored record.
    ///
    /// # Examples
    ///
    /// ```
    /// use verkv_kv::Entry;
    ///
    /// let absent = Entry::absent("a");
    /// assert_eq!(absent, Entry::new("a", "", 0));
    /// assert!(absent.is_tombstone());
    /// ```
    pub fn absent(key: impl Into<String>) -> Self {
        Self::new(key, String::new(), 0)
    }

    /// Returns true if this entry deletes its key.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}
