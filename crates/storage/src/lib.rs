//! Storage layer for the verkv replicated key-value store.
//!
//! The backing store speaks only strings. [`TypedStore`] layers a typed,
//! transactional key-value view over it by running every key and value
//! through an injected [`Codec`].
//!
//! # Example
//!
//! ```
//! use verkv_storage::TypedStore;
//!
//! let store: TypedStore<String, u64> = TypedStore::in_memory();
//! store.update(|txn| txn.set(&"hits".to_string(), &3));
//! let hits = store.update(|txn| txn.get(&"hits".to_string()));
//! assert_eq!(hits, Some(3));
//! ```

pub mod backend;
pub mod codec;
pub mod memory;
pub mod typed;

// Re-export commonly used types for convenience
pub use backend::{StringStore, StringTxn};
pub use codec::{Codec, CodecError, JsonCodec};
pub use memory::MemStore;
pub use typed::{CorruptionError, TypedStore, TypedTxn};
