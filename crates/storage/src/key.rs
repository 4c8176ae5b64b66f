//! Remote key validation.
//!
//! Remote keys address objects within a bucket. They are derived from
//! user-supplied model names and version ids, so every backend normalizes
//! and checks them the same way before use: a hostile identifier must never
//! be able to address objects outside the bucket namespace, or produce two
//! spellings of the same key.

use crate::error::{ErrorKind, Result};

/// Validates a remote key for security and correctness.
/// Ensures that keys don't escape the bucket namespace (no `..` traversal).
///
/// # Returns
/// Returns the normalized key if valid, or
/// [`InvalidKey`](crate::error::ErrorKind::InvalidKey) if invalid.
///
/// # Examples
///
/// ```
/// use nexus_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("test_model/abc123.pt").is_ok());
/// assert!(validate_key("a/b/c/weights.onnx").is_ok());
/// // Invalid keys
/// assert!(validate_key("../escape").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(
///     validate_key("wrong/../still-wrong/.././correct//./key.pt/").unwrap(),
///     "correct/key.pt"
/// );
/// ```
pub fn validate(key: &str) -> Result<String> {
    // Null bytes truncate in C-based syscalls and are never legitimate in
    // an object key.
    if key.contains('\0') {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            other => segments.push(other),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}
