//! Index Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! TODO: Definitely going to refactor this later once I've written a few
//!       more crates. Designing errors in Rust is **hard** and I don't want
//!       to resort to anyhow+thiserror just because I don't want to deal with it.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A snapshot exists but cannot be parsed into the expected shape.
    /// Fatal: the index refuses to guess and never auto-repairs.
    #[display("corrupt index snapshot: {_0}")]
    CorruptIndex(#[error(not(source))] String),
    /// The version id is already recorded for this model. Recoverable by
    /// choosing a different id; recorded versions are never overwritten.
    #[display("duplicate version: ({_0}, {_1})")]
    DuplicateVersion(#[error(not(source))] String, String),
    /// No history exists for this model.
    #[display("unknown model: {_0}")]
    UnknownModel(#[error(not(source))] String),
    /// The model exists but has no such version.
    #[display("unknown version: ({_0}, {_1})")]
    UnknownVersion(#[error(not(source))] String, String),
    /// Model names and version ids must be non-empty.
    #[display("empty model or version identifier")]
    EmptyIdentifier,
    /// Underlying I/O error reading or writing the snapshot.
    #[display("I/O error: {_0}")]
    Io(IoError),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
