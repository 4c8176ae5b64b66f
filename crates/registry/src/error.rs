//! Registry Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! TODO: Definitely going to refactor this later once I've written a few
//!       more crates. Designing errors in Rust is **hard** and I don't want
//!       to resort to anyhow+thiserror just because I don't want to deal with it.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A registry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// The façade never translates errors from its collaborators: index and
/// storage failures cross this boundary as child frames under a thin kind,
/// with their own context (model name, version id, key) intact.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Failure inside the version index.
    #[display("index error")]
    Index,
    /// Failure inside the storage gateway.
    #[display("storage error")]
    Storage,
    /// The local artifact file could not be read.
    #[display("unreadable artifact: {}", _0.display())]
    UnreadableArtifact(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Convert an index error into a registry error, preserving the index
    /// crate's `Exn` frame (error tree) as a child in its own error tree.
    #[track_caller]
    pub fn index(err: nexus_index::error::Error) -> Error {
        err.raise(ErrorKind::Index)
    }

    /// Convert a storage error into a registry error, preserving the
    /// storage crate's `Exn` frame as a child.
    #[track_caller]
    pub fn storage(err: nexus_storage::error::Error) -> Error {
        err.raise(ErrorKind::Storage)
    }

    /// Returns `true` if retrying might succeed.
    ///
    /// Retryability lives in the child kinds; the façade itself never
    /// retries.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
