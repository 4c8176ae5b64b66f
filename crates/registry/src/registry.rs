//! The registry façade.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nexus_index::{ModelEntry, SNAPSHOT_FILE, VersionIndex, VersionRecord, VersionSelector};
use nexus_storage::{BackendHandle, StorageBackend};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A project's model registry: one index, one storage backend.
///
/// The registry owns its [`VersionIndex`] exclusively (single-writer
/// assumption — the snapshot file is not lock-protected) and persists it
/// after every successful mutation. Index errors pass through unchanged as
/// child error frames; the façade attempts no reconciliation beyond its
/// upload-then-record ordering.
pub struct Registry {
    index: VersionIndex,
    snapshot_path: PathBuf,
    backend: BackendHandle,
}

impl Registry {
    /// Open the registry rooted at a project directory.
    ///
    /// Loads `<root>/.nexus_meta.json` if present, otherwise starts with an
    /// empty index.
    pub async fn open(project_root: impl AsRef<Path>, backend: BackendHandle) -> Result<Self> {
        let snapshot_path = project_root.as_ref().join(SNAPSHOT_FILE);
        let index = VersionIndex::load(&snapshot_path).await.map_err(ErrorKind::index)?;
        Ok(Self { index, snapshot_path, backend })
    }

    /// Read-only access to the underlying index.
    pub fn index(&self) -> &VersionIndex {
        &self.index
    }

    /// Every recorded model × version pair, latest marked.
    pub fn list(&self) -> Vec<ModelEntry> {
        self.index.list_all()
    }

    /// Upload an artifact and record it as the model's newest version.
    ///
    /// When `version_id` is `None` the artifact's BLAKE3 content hash is
    /// used, so identical bytes always get the same identity. Extension and
    /// byte size are observed from the file; the remote key is derived as
    /// `{model}/{version}.{extension}`.
    ///
    /// The index is only touched after the upload is confirmed: a failed
    /// `put` leaves both the in-memory index and the snapshot exactly as
    /// they were.
    #[instrument(skip(self))]
    pub async fn push(
        &mut self,
        artifact: &Path,
        model_name: &str,
        version_id: Option<&str>,
    ) -> Result<VersionRecord> {
        let metadata = tokio::fs::metadata(artifact)
            .await
            .or_raise(|| ErrorKind::UnreadableArtifact(artifact.to_path_buf()))?;
        let byte_size = metadata.len();
        let version_id = match version_id {
            Some(id) => id.to_string(),
            None => content_hash(artifact).await?,
        };
        let file_extension = artifact
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        let remote_key = derive_remote_key(model_name, &version_id, &file_extension);

        self.backend.put(artifact, &remote_key).await.map_err(ErrorKind::storage)?;
        // Only now, with the bytes confirmed stored, does the version exist.
        let record = self
            .index
            .add_version(model_name, &version_id, &remote_key, byte_size, &file_extension)
            .map_err(ErrorKind::index)?
            .clone();
        self.index.save(&self.snapshot_path).await.map_err(ErrorKind::index)?;
        tracing::info!(
            model = model_name,
            version = record.version_id.as_str(),
            key = record.remote_key.as_str(),
            bytes = record.byte_size,
            "pushed artifact"
        );
        Ok(record)
    }

    /// Download a version of a model to `destination`.
    #[instrument(skip(self))]
    pub async fn pull(
        &self,
        model_name: &str,
        selector: &VersionSelector,
        destination: &Path,
    ) -> Result<PathBuf> {
        let remote_key = self.index.resolve(selector, model_name).map_err(ErrorKind::index)?;
        self.backend.get(remote_key, destination).await.map_err(ErrorKind::storage)?;
        tracing::info!(model = model_name, key = remote_key, "pulled artifact");
        Ok(destination.to_path_buf())
    }

    /// Repoint a model's latest pointer (rollback/promotion) and persist.
    pub async fn rollback(&mut self, version_id: &str, model_name: &str) -> Result<()> {
        self.index.set_latest(version_id, model_name).map_err(ErrorKind::index)?;
        self.index.save(&self.snapshot_path).await.map_err(ErrorKind::index)?;
        tracing::info!(model = model_name, version = version_id, "latest pointer moved");
        Ok(())
    }
}

/// BLAKE3 hash of the artifact contents, hex-encoded.
async fn content_hash(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .or_raise(|| ErrorKind::UnreadableArtifact(path.to_path_buf()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn derive_remote_key(model_name: &str, version_id: &str, extension: &str) -> String {
    match extension.is_empty() {
        true => format!("{model_name}/{version_id}"),
        false => format!("{model_name}/{version_id}.{extension}"),
    }
}
