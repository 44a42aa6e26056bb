//! Canonical string encoding for typed keys and values.
//!
//! A codec must round-trip exactly: `decode(encode(x)) == x` for every value
//! it accepts. Anything it cannot represent is reported as an encode error
//! rather than silently approximated.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while encoding or decoding a record.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value cannot be represented in the encoding.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The stored string does not decode into the expected type.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Result type for codec methods
pub type CodecResult<T> = Result<T, CodecError>;

/// Deterministic encoding between typed values and strings.
pub trait Codec: Send + Sync {
    /// Encode `value` into its canonical string form.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<String>;

    /// Decode a string produced by [`Codec::encode`].
    fn decode<T: DeserializeOwned>(&self, raw: &str) -> CodecResult<T>;
}

/// JSON codec backed by `serde_json`.
///
/// Struct fields are written in declaration order and maps in their own
/// iteration order, so encoding the same value always yields the same string.
///
/// # Examples
///
/// ```
/// use verkv_storage::{Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let raw = codec.encode("key").unwrap();
/// assert_eq!(raw, "\"key\"");
/// let back: String = codec.decode(&raw).unwrap();
/// assert_eq!(back, "key");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<String> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> CodecResult<T> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
