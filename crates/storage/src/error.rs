//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! TODO: Definitely going to refactor this later once I've written a few
//!       more crates. Designing errors in Rust is **hard** and I don't want
//!       to resort to anyhow+thiserror just because I don't want to deal with it.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Remote key does not exist in the bucket.
    #[display("remote key not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Transport-level failure talking to the provider.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Credentials absent from the environment or rejected by the provider.
    #[display("credentials error: {_0}")]
    Credentials(#[error(not(source))] String),
    /// Key contains invalid characters or escapes the bucket namespace.
    #[display("invalid remote key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Local-file I/O failure during a transfer.
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Configuration error surfaced while selecting a backend.
    #[display("configuration error")]
    Config,
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Convert a configuration error into a storage error, preserving the
    /// config crate's `Exn` frame (error tree) as a child in its own
    /// error tree.
    #[track_caller]
    pub fn config(err: nexus_config::error::Error) -> Error {
        err.raise(ErrorKind::Config)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_))
    }
}
