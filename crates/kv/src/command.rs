//! Commands delivered by the consensus log.
//!
//! A command is an ordered batch of entries tagged with a fresh UUID. The UUID
//! is the command's identity: two commands are the same operation exactly when
//! their ids match, whatever their payloads.

use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;
use verkv_common::{Error, Result};

/// An idempotency-tagged batch of entry updates.
///
/// Serialized as `{"uuid": .., "entries": [..]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "uuid")]
    id: Uuid,
    entries: Vec<Entry>,
}

/// Wrap `entries` in a new command with a freshly minted id.
///
/// # Examples
///
/// ```
/// use verkv_kv::{make_command, Entry};
///
/// let a = make_command(vec![Entry::new("k", "v", 1)]);
/// let b = make_command(vec![Entry::new("k", "v", 1)]);
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
pub fn make_command(entries: Vec<Entry>) -> Command {
    Command {
        id: Uuid::new_v4(),
        entries,
    }
}

impl Command {
    /// The idempotency token of this command.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The entries, in the order they are applied.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Encode into the JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if `bytes` is not a well-formed command.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_make_command_keeps_entry_order() {
        let entries = vec![
            Entry::new("b", "2", 1),
            Entry::new("a", "1", 1),
            Entry::tombstone("c", 3),
        ];
        let cmd = make_command(entries.clone());
        assert_eq!(cmd.entries(), entries.as_slice());
    }

    #[test]
    fn test_make_command_mints_distinct_ids() {
        let a = make_command(vec![]);
        let b = make_command(vec![]);
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_ignores_payload() {
        let cmd = make_command(vec![Entry::new("a", "x", 1)]);
        let json = format!(
            r#"{{"uuid":"{}","entries":[{{"key":"z","val":"other","ver":9}}]}}"#,
            cmd.id()
        );
        let redelivered = Command::from_bytes(json.as_bytes()).expect("Decode should succeed");

        assert_eq!(cmd, redelivered);
        assert_ne!(cmd.entries(), redelivered.entries());
    }

    #[test]
    fn test_hash_follows_identity() {
        let cmd = make_command(vec![Entry::new("a", "x", 1)]);
        let mut seen = HashSet::new();
        assert!(seen.insert(cmd.clone()));
        assert!(!seen.insert(cmd));
        assert!(seen.insert(make_command(vec![Entry::new("a", "x", 1)])));
    }

    #[test]
    fn test_wire_field_names() {
        let cmd = make_command(vec![Entry::new("a", "x", 4)]);
        let bytes = cmd.to_bytes().expect("Encode should succeed");
        let json = String::from_utf8(bytes).expect("Wire form should be UTF-8");

        assert_eq!(
            json,
            format!(
                r#"{{"uuid":"{}","entries":[{{"key":"a","val":"x","ver":4}}]}}"#,
                cmd.id()
            )
        );
    }

    #[test]
    fn test_from_bytes_restores_entries() {
        let cmd = make_command(vec![Entry::new("a", "x", 4), Entry::tombstone("b", 2)]);
        let bytes = cmd.to_bytes().expect("Encode should succeed");
        let decoded = Command::from_bytes(&bytes).expect("Decode should succeed");

        assert_eq!(decoded.id(), cmd.id());
        assert_eq!(decoded.entries(), cmd.entries());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = Command::from_bytes(&[0xFF, 0x00, 0x12]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_from_bytes_rejects_bad_uuid() {
        let result = Command::from_bytes(br#"{"uuid":"not-a-uuid","entries":[]}"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
