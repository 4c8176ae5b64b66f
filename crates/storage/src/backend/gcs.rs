//! Google Cloud Storage backend.
//!
//! GCS is addressed through its XML interoperability API, which speaks the
//! S3 protocol with HMAC credentials, so this backend is a thin wrapper
//! around the S3-compatible client pinned to the Google endpoint. The HMAC
//! key pair is created per service account in the GCS console
//! ("Interoperability" settings).
//!
//! TODO: Revisit if a maintained native GCS SDK for Rust materializes —
//!       the JSON API supports resumable uploads the interop layer doesn't.

use crate::StorageBackend;
use crate::backend::s3::S3Backend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Interoperability endpoint for Google Cloud Storage.
const GCS_ENDPOINT: &str = "https://storage.googleapis.com";
/// Region literal accepted by the interop layer for signing.
const GCS_REGION: &str = "auto";

/// Google Cloud Storage backend (S3-interoperability API).
///
/// # Examples
///
/// ```no_run
/// use nexus_storage::backend::GcsBackend;
///
/// let backend = GcsBackend::new("gcs", "my-model-bucket", "hmac_key_id", "hmac_secret");
/// ```
#[derive(Debug)]
pub struct GcsBackend {
    inner: S3Backend,
}

impl GcsBackend {
    /// Create a new GCS storage backend from an HMAC key pair.
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            inner: S3Backend::new(
                name,
                bucket,
                GCS_REGION,
                Some(GCS_ENDPOINT.to_string()),
                key_id,
                key_secret,
            ),
        }
    }
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn put(&self, local_path: &Path, remote_key: &str) -> Result<()> {
        self.inner.put(local_path, remote_key).await
    }

    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<()> {
        self.inner.get(remote_key, local_path).await
    }

    async fn exists(&self, remote_key: &str) -> Result<bool> {
        self.inner.exists(remote_key).await
    }
}
