//! Crate-wide error taxonomy.
//!
//! Every encode/decode operation returns a typed error instead of partially
//! populated output.  Checksum failures are never downgraded: a corrupt
//! trailer surfaces as [`FormatError::CorruptData`], never as an empty
//! container.

use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodecError;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Error, Debug)]
pub enum FormatError {
    /// Read cursor asked for more bytes than the region holds.
    #[error("read of {requested} bytes at offset {offset} exceeds region of {len} bytes")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        len: usize,
    },

    /// Write cursor exceeded the region's fixed capacity.
    #[error("write of {requested} bytes exceeds remaining capacity of {remaining} bytes")]
    Overflow { requested: usize, remaining: usize },

    /// Wrong magic tag, unsupported version, or bad header flags.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    /// A checksum disagreed with the bytes it covers, or a structural field
    /// points outside its container.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// The header declares more payload bytes than the buffer holds.
    #[error("truncated input: header declares {declared} payload bytes, {actual} available")]
    TruncatedInput { declared: u64, actual: u64 },

    #[error("duplicate key: {0:?}")]
    DuplicateKey(String),

    #[error("not found: {0:?}")]
    NotFound(String),

    /// A resume token was presented against a container it was not derived
    /// from.
    #[error("resume token for container {token} does not match container {container}")]
    TokenMismatch { container: Uuid, token: Uuid },

    /// The container was rewritten after the token was issued.
    #[error("stale resume token: container is at generation {container}, token at generation {token}")]
    StaleToken { container: u64, token: u64 },

    /// A structural limit of the on-disk layout would be exceeded.
    #[error("format limit exceeded: {0}")]
    FormatLimitExceeded(String),

    /// Failure inside the external compression capability.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Archive entry index could not be serialized.
    #[error("index serialization failed: {0}")]
    IndexSerialization(#[from] serde_json::Error),
}
