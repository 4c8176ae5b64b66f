//! Index models.
//!
//! These types are both the in-memory representation and the shape the
//! snapshot document round-trips through (see the `snapshot` module for the
//! field-level mapping).

use derive_more::Display;
use time::UtcDateTime;

/// One immutable artifact revision of a model.
///
/// Immutable once created: rollback repoints the latest pointer, it never
/// edits or removes records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Opaque version identifier, unique within one model's history.
    /// Typically a content hash.
    pub version_id: String,
    /// Path of the artifact within the bucket, independent of provider.
    pub remote_key: String,
    /// Artifact size in bytes, as observed at push time.
    pub byte_size: u64,
    /// File extension without a leading dot (may be empty).
    pub file_extension: String,
    /// When this version was recorded. Whole-second precision: the
    /// snapshot stores unix seconds.
    pub created_at: UtcDateTime,
}

/// One row of [`list_all`](crate::VersionIndex::list_all) output: a
/// model × version pair flattened across the whole index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub model_name: String,
    pub version_id: String,
    pub remote_key: String,
    pub byte_size: u64,
    pub file_extension: String,
    pub created_at: UtcDateTime,
    /// Whether this version is the one the model's latest pointer names.
    pub is_latest: bool,
}

/// What the caller wants resolved: a literal version id, or whatever the
/// model's latest pointer currently names.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// The `latest` sentinel.
    #[display("latest")]
    Latest,
    /// A literal version id.
    #[display("{_0}")]
    Id(String),
}

impl VersionSelector {
    /// The string literal recognized as the latest sentinel.
    pub const LATEST: &'static str = "latest";
}

impl From<&str> for VersionSelector {
    fn from(value: &str) -> Self {
        match value {
            Self::LATEST => Self::Latest,
            id => Self::Id(id.to_string()),
        }
    }
}
