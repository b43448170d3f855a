//! Custom error types for the persist-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Every variant carries the byte offset of the record that failed, so a
/// caller can locate the problem in the original buffer. A magic mismatch at
/// the header is deliberately *not* represented here: "not this format" is a
/// clean outcome, reported as `Ok(None)` by [`crate::persist::decode`].
#[derive(Debug, Error)]
pub enum PersistError {
    /// The input ended, or a size bound was exceeded, before a record could
    /// be fully read.
    #[error("Truncated input at offset {offset}: {what}")]
    Truncated { offset: u64, what: String },

    /// A single-character or named tag has no matching decoder.
    #[error("Unknown record tag {tag:?} at offset {offset}")]
    UnknownTag { offset: u64, tag: String },

    /// A back-reference points at an offset with no object table entry.
    #[error("Unresolved back-reference to offset {target} at offset {offset}")]
    UnresolvedReference { offset: u64, target: u64 },

    /// A `U` record's key is missing from the capability registry.
    #[error("Unresolved capability key {key:?} at offset {offset}")]
    UnresolvedCapability { offset: u64, key: String },

    /// The reserved `X` tag, which is intentionally unimplemented.
    #[error("Record at offset {offset} uses a reserved, unsupported tag")]
    Unsupported { offset: u64 },

    /// A `C` record carries a sub-tag other than `N`, `T` or `F`.
    #[error("Invalid constant sub-tag 0x{subtag:02x} at offset {offset}")]
    InvalidConstant { offset: u64, subtag: u8 },

    /// The record is structurally invalid (bad integer width selector, bad
    /// bytecode version byte, non-UTF-8 string payload, ...).
    #[error("Invalid record at offset {offset}: {reason}")]
    InvalidFormat { offset: u64, reason: String },
}

impl PersistError {
    /// Byte offset of the record that failed to decode.
    pub fn offset(&self) -> u64 {
        match self {
            PersistError::Truncated { offset, .. }
            | PersistError::UnknownTag { offset, .. }
            | PersistError::UnresolvedReference { offset, .. }
            | PersistError::UnresolvedCapability { offset, .. }
            | PersistError::Unsupported { offset }
            | PersistError::InvalidConstant { offset, .. }
            | PersistError::InvalidFormat { offset, .. } => *offset,
        }
    }
}

/// A convenience `Result` type alias using the crate's `PersistError` type.
pub type Result<T> = std::result::Result<T, PersistError>;
