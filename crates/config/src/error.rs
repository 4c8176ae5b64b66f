//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! TODO: Definitely going to refactor this later once I've written a few
//!       more crates. Designing errors in Rust is **hard** and I don't want
//!       to resort to anyhow+thiserror just because I don't want to deal with it.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The `provider` key holds a literal this build does not recognize.
    /// Only reported when the provider is actually read, never at load time.
    #[display("invalid provider: {_0} (expected `s3` or `gcs`)")]
    InvalidProvider(#[error(not(source))] String),
    /// The `bucket` key is absent. There is no default bucket.
    #[display("bucket name not configured")]
    MissingBucket,
    /// The config file exists but could not be read or parsed.
    #[display("unreadable config file: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
