//! The in-memory index and its operations.

use crate::error::{ErrorKind, Result};
use crate::models::{ModelEntry, VersionRecord, VersionSelector};
use crate::snapshot;
use exn::OptionExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// In-memory index of every model's version history and latest pointer.
///
/// The index is an explicit value with a `load`/`save` persistence boundary.
/// Mutations ([`add_version`](Self::add_version),
/// [`set_latest`](Self::set_latest)) are pure in-memory edits; nothing
/// touches disk until [`save`](Self::save) runs. Callers that want a
/// mutation to be durable must save afterwards.
///
/// # Examples
///
/// ```
/// use nexus_index::{VersionIndex, VersionSelector};
///
/// # fn example() -> nexus_index::error::Result<()> {
/// let mut index = VersionIndex::new();
/// index.add_version("test_model", "abc123", "test_model/abc123.pt", 1024, "pt")?;
/// let key = index.resolve(&VersionSelector::Latest, "test_model")?;
/// assert_eq!(key, "test_model/abc123.pt");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct VersionIndex {
    pub(crate) models: HashMap<String, ModelHistory>,
}

/// One model's recorded versions plus its latest pointer.
///
/// A `ModelHistory` exists iff it holds at least one record, so `latest`
/// is never empty and always names a record in `records`.
#[derive(Debug)]
pub(crate) struct ModelHistory {
    /// Insertion order is chronological; no version id repeats.
    pub(crate) records: Vec<VersionRecord>,
    pub(crate) latest: String,
}

impl ModelHistory {
    fn contains(&self, version_id: &str) -> bool {
        self.records.iter().any(|record| record.version_id == version_id)
    }

    fn get(&self, version_id: &str) -> Option<&VersionRecord> {
        self.records.iter().find(|record| record.version_id == version_id)
    }

    fn latest_record(&self) -> &VersionRecord {
        // unwrap is safe: `latest` is kept pointing at an existing record
        // by add_version/set_latest and validated on load.
        self.get(&self.latest).unwrap()
    }
}

impl VersionIndex {
    /// An empty index with no history for any model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted snapshot into memory.
    ///
    /// A snapshot that does not exist yields an empty index — only a
    /// snapshot that exists but cannot be parsed into the expected shape
    /// fails, with [`CorruptIndex`](ErrorKind::CorruptIndex).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no snapshot found, starting empty");
                return Ok(Self::new());
            },
            Err(err) => return Err(exn::Exn::from(ErrorKind::Io(err))),
        };
        let index = snapshot::parse(&bytes)?;
        tracing::debug!(path = %path.display(), models = index.models.len(), "snapshot loaded");
        Ok(index)
    }

    /// Record a new version and advance the model's latest pointer to it
    /// (most recently added wins).
    ///
    /// The model's history is created implicitly on its first version.
    /// Re-using a version id within one model fails with
    /// [`DuplicateVersion`](ErrorKind::DuplicateVersion): records are
    /// immutable, and an idempotent no-op could silently accept a re-push
    /// whose key, size, or extension differ from what was recorded.
    ///
    /// This is a pure in-memory mutation; call [`save`](Self::save) to
    /// persist it.
    pub fn add_version(
        &mut self,
        model_name: &str,
        version_id: &str,
        remote_key: &str,
        byte_size: u64,
        file_extension: &str,
    ) -> Result<&VersionRecord> {
        if model_name.is_empty() || version_id.is_empty() {
            exn::bail!(ErrorKind::EmptyIdentifier);
        }
        if let Some(history) = self.models.get(model_name)
            && history.contains(version_id)
        {
            exn::bail!(ErrorKind::DuplicateVersion(model_name.to_string(), version_id.to_string()));
        }
        let record = VersionRecord {
            version_id: version_id.to_string(),
            remote_key: remote_key.to_string(),
            byte_size,
            file_extension: file_extension.trim_start_matches('.').to_string(),
            created_at: now_to_the_second(),
        };
        let history = self.models.entry(model_name.to_string()).or_insert_with(|| ModelHistory {
            records: Vec::new(),
            latest: String::new(),
        });
        history.records.push(record);
        history.latest = version_id.to_string();
        // unwrap is safe: the record was pushed two lines up.
        Ok(history.records.last().unwrap())
    }

    /// Look up the record a selector names.
    pub fn record(&self, selector: &VersionSelector, model_name: &str) -> Result<&VersionRecord> {
        let history = self
            .models
            .get(model_name)
            .ok_or_raise(|| ErrorKind::UnknownModel(model_name.to_string()))?;
        match selector {
            VersionSelector::Latest => Ok(history.latest_record()),
            VersionSelector::Id(version_id) => history.get(version_id).ok_or_raise(|| {
                ErrorKind::UnknownVersion(model_name.to_string(), version_id.clone())
            }),
        }
    }

    /// Resolve a selector to the stored remote key.
    pub fn resolve(&self, selector: &VersionSelector, model_name: &str) -> Result<&str> {
        Ok(&self.record(selector, model_name)?.remote_key)
    }

    /// Repoint a model's latest pointer at an already-recorded version.
    ///
    /// This is the rollback/promotion mechanism: history is never deleted
    /// or reordered, only the pointer moves. In-memory only, like
    /// [`add_version`](Self::add_version).
    pub fn set_latest(&mut self, version_id: &str, model_name: &str) -> Result<()> {
        let history = self
            .models
            .get_mut(model_name)
            .ok_or_raise(|| ErrorKind::UnknownModel(model_name.to_string()))?;
        if !history.contains(version_id) {
            exn::bail!(ErrorKind::UnknownVersion(model_name.to_string(), version_id.to_string()));
        }
        history.latest = version_id.to_string();
        Ok(())
    }

    /// Flatten every model × version pair across the whole index.
    ///
    /// Models are sorted by name (cross-model order is otherwise
    /// arbitrary); versions within a model keep insertion order.
    pub fn list_all(&self) -> Vec<ModelEntry> {
        let mut names: Vec<&String> = self.models.keys().collect();
        names.sort();
        let mut entries = Vec::new();
        for name in names {
            let history = &self.models[name.as_str()];
            for record in &history.records {
                entries.push(ModelEntry {
                    model_name: name.clone(),
                    version_id: record.version_id.clone(),
                    remote_key: record.remote_key.clone(),
                    byte_size: record.byte_size,
                    file_extension: record.file_extension.clone(),
                    created_at: record.created_at,
                    is_latest: record.version_id == history.latest,
                });
            }
        }
        entries
    }

    /// Whether any model has recorded history.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Serialize the full index to `path`, replacing any prior snapshot.
    ///
    /// The write is atomic: the document goes to a sibling temp file first
    /// and is renamed into place, so a crash never leaves a half-written
    /// snapshot behind.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = snapshot::render(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        let tmp = temp_sibling(path);
        tokio::fs::write(&tmp, &bytes).await.map_err(ErrorKind::Io)?;
        tokio::fs::rename(&tmp, path).await.map_err(ErrorKind::Io)?;
        tracing::debug!(path = %path.display(), models = self.models.len(), "snapshot written");
        Ok(())
    }
}

/// Current time truncated to whole seconds, matching snapshot precision so
/// a save/load round-trip compares equal.
fn now_to_the_second() -> UtcDateTime {
    // unwrap is safe: the current unix timestamp is always in range.
    UtcDateTime::from_unix_timestamp(UtcDateTime::now().unix_timestamp()).unwrap()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VersionIndex {
        let mut index = VersionIndex::new();
        index
            .add_version("test_model", "abc123", "test_model/abc123.pt", 1024, "pt")
            .unwrap();
        index
            .add_version("test_model", "def456", "test_model/def456.pt", 2048, "pt")
            .unwrap();
        index
    }

    #[test]
    fn test_add_and_resolve_roundtrip() {
        let mut index = VersionIndex::new();
        let record = index
            .add_version("test_model", "abc123", "test_model/abc123.pt", 1024, "pt")
            .unwrap();
        assert_eq!(record.version_id, "abc123");
        assert_eq!(record.byte_size, 1024);
        let selector = VersionSelector::Id("abc123".to_string());
        assert_eq!(index.resolve(&selector, "test_model").unwrap(), "test_model/abc123.pt");
    }

    #[test]
    fn test_every_add_advances_latest() {
        let index = sample_index();
        assert_eq!(
            index.resolve(&VersionSelector::Latest, "test_model").unwrap(),
            "test_model/def456.pt"
        );
    }

    #[test]
    fn test_rollback_is_non_destructive() {
        let mut index = sample_index();
        let before: Vec<_> = index.list_all();
        index.set_latest("abc123", "test_model").unwrap();
        assert_eq!(
            index.resolve(&VersionSelector::Latest, "test_model").unwrap(),
            "test_model/abc123.pt"
        );
        // Only the latest pointer moved: same records, same order, same fields.
        let after = index.list_all();
        assert_eq!(after.len(), before.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.version_id, a.version_id);
            assert_eq!(b.remote_key, a.remote_key);
            assert_eq!(b.byte_size, a.byte_size);
            assert_eq!(b.created_at, a.created_at);
        }
        assert!(after.iter().find(|e| e.version_id == "abc123").unwrap().is_latest);
        assert!(!after.iter().find(|e| e.version_id == "def456").unwrap().is_latest);
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let mut index = sample_index();
        let err = index
            .add_version("test_model", "abc123", "test_model/other.pt", 1, "pt")
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateVersion(model, version)
            if model == "test_model" && version == "abc123"));
        // The failed add must not have touched anything.
        assert_eq!(index.list_all().len(), 2);
        assert_eq!(
            index.resolve(&VersionSelector::Latest, "test_model").unwrap(),
            "test_model/def456.pt"
        );
    }

    #[test]
    fn test_same_version_id_across_models() {
        let mut index = VersionIndex::new();
        index.add_version("model_a", "abc123", "model_a/abc123.pt", 1, "pt").unwrap();
        index.add_version("model_b", "abc123", "model_b/abc123.pt", 2, "pt").unwrap();
        let selector = VersionSelector::Id("abc123".to_string());
        assert_eq!(index.resolve(&selector, "model_a").unwrap(), "model_a/abc123.pt");
        assert_eq!(index.resolve(&selector, "model_b").unwrap(), "model_b/abc123.pt");
    }

    #[test]
    fn test_unknown_model() {
        let index = VersionIndex::new();
        let err = index.resolve(&VersionSelector::Latest, "nope").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownModel(model) if model == "nope"));
        let err = index
            .resolve(&VersionSelector::Id("abc123".to_string()), "nope")
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownModel(_)));
    }

    #[test]
    fn test_unknown_version() {
        let index = sample_index();
        let err = index
            .resolve(&VersionSelector::Id("zzz999".to_string()), "test_model")
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownVersion(model, version)
            if model == "test_model" && version == "zzz999"));
    }

    #[test]
    fn test_set_latest_requires_existing_version() {
        let mut index = sample_index();
        let err = index.set_latest("zzz999", "test_model").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownVersion(_, _)));
        let err = index.set_latest("abc123", "nope").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownModel(_)));
    }

    #[test]
    fn test_empty_identifiers_rejected() {
        let mut index = VersionIndex::new();
        let err = index.add_version("", "abc123", "k", 1, "pt").unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyIdentifier));
        let err = index.add_version("m", "", "k", 1, "pt").unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyIdentifier));
    }

    #[test]
    fn test_extension_leading_dot_stripped() {
        let mut index = VersionIndex::new();
        let record = index.add_version("m", "v1", "m/v1.pt", 1, ".pt").unwrap();
        assert_eq!(record.file_extension, "pt");
    }

    #[test]
    fn test_list_all_ordering() {
        let mut index = VersionIndex::new();
        index.add_version("zebra", "v1", "zebra/v1.pt", 1, "pt").unwrap();
        index.add_version("alpha", "v2", "alpha/v2.pt", 2, "pt").unwrap();
        index.add_version("alpha", "v1", "alpha/v1.pt", 3, "pt").unwrap();
        let entries = index.list_all();
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.model_name.as_str(), e.version_id.as_str()))
            .collect();
        // Models sorted by name; versions in insertion (not lexical) order.
        assert_eq!(pairs, vec![("alpha", "v2"), ("alpha", "v1"), ("zebra", "v1")]);
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::SNAPSHOT_FILE);
        let mut index = sample_index();
        index.add_version("other_model", "xyz789", "other_model/xyz789.onnx", 37, "onnx").unwrap();
        index.set_latest("abc123", "test_model").unwrap();
        index.save(&path).await.unwrap();

        let reloaded = VersionIndex::load(&path).await.unwrap();
        assert_eq!(reloaded.list_all(), index.list_all());
        assert_eq!(
            reloaded.resolve(&VersionSelector::Latest, "test_model").unwrap(),
            "test_model/abc123.pt"
        );
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = VersionIndex::load(dir.path().join(crate::SNAPSHOT_FILE)).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::SNAPSHOT_FILE);
        sample_index().save(&path).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![crate::SNAPSHOT_FILE.to_string()]);
    }

    #[tokio::test]
    async fn test_save_replaces_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::SNAPSHOT_FILE);
        let mut index = VersionIndex::new();
        index.add_version("m", "v1", "m/v1.pt", 1, "pt").unwrap();
        index.save(&path).await.unwrap();
        index.add_version("m", "v2", "m/v2.pt", 2, "pt").unwrap();
        index.save(&path).await.unwrap();

        let reloaded = VersionIndex::load(&path).await.unwrap();
        assert_eq!(reloaded.list_all().len(), 2);
        assert_eq!(reloaded.resolve(&VersionSelector::Latest, "m").unwrap(), "m/v2.pt");
    }
}
