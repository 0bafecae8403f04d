//! Error types for the write-ahead log.

use std::io;

/// Errors produced by the write-ahead log.
///
/// Variants are non-overlapping: each failure mode maps to exactly one
/// of these kinds. [`WalError::Io`] is the only variant that wraps an
/// underlying error.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    /// A write would exceed the mapped file's fixed capacity.
    #[error("write of {requested} bytes at offset {offset} exceeds mmap capacity {capacity}")]
    OutOfSize {
        requested: u64,
        offset: u64,
        capacity: u64,
    },

    /// A single record frame would exceed the maximum encodable size.
    #[error("record of {0} bytes exceeds the maximum frame size")]
    OutOfRecordSize(u64),

    /// A decode failed: a buffer was too short or internally inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    /// The file's header magic or version did not match what this
    /// build expects.
    #[error("file corrupt: {0}")]
    FileCorrupt(&'static str),

    /// The requested index is not present in the log.
    #[error("index {0} not found")]
    NotFound(u64),

    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, WalError>;
