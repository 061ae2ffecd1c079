//! Error types for bundle decoding and encoding.
use std::path::PathBuf;

use thiserror::Error;

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The zlib stream of a container chunk did not decode to completion.
    #[error("corrupt chunk: {0}")]
    CorruptChunk(String),

    /// A declared size points past the end of the available bytes.
    #[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput { offset: u64, needed: u64, available: u64 },

    /// Record section hashes disagree with the key array entry at the same position.
    ///
    /// Only ever logged. The record is still associated by position.
    #[error(
        "record {index} mismatch: key {key_type:016x}/{key_name:016x}, record {record_type:016x}/{record_name:016x}"
    )]
    RecordMismatch {
        index: usize,
        key_type: u64,
        key_name: u64,
        record_type: u64,
        record_name: u64,
    },

    /// A source file name does not follow `<name_hash>.<type>`.
    #[error("invalid source name: {0:?}")]
    InvalidSourceName(String),

    #[error("invalid {field}: {value}")]
    InvalidLength { field: &'static str, value: i64 },

    /// A final short slice compressed to at least the chunk threshold and
    /// can be stored neither raw nor compressed.
    #[error("chunk of {len} bytes at offset {offset} does not compress below the chunk threshold")]
    UnstorableChunk { offset: usize, len: usize },

    #[error("duplicate resource {type_hash:016x}/{name_hash:016x}")]
    DuplicateResource { type_hash: u64, name_hash: u64 },

    #[error("payload of {0} bytes does not fit the chunk size field")]
    PayloadTooLarge(usize),

    #[error("pre-decoder failed for {path:?}: {reason}")]
    Decoder { path: PathBuf, reason: String },
}
