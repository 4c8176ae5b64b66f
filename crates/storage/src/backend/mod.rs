//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! transfer interface across the supported providers, and the factory that
//! maps a repository configuration onto a concrete adapter.

mod gcs;
#[cfg(feature = "mock")]
mod mock;
mod s3;

pub use self::gcs::GcsBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::s3::S3Backend;
use crate::BackendHandle;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use nexus_config::{CloudProvider, Config};
use std::path::Path;
use std::sync::Arc;

/// Unified interface for storage backends.
///
/// Deliberately thin: the registry needs to move one artifact at a time
/// between a local path and a remote key, nothing more. Listing, renaming
/// and deletion are index concerns, not transfer concerns. All operations
/// block (asynchronously) for the duration of the transfer; no retry policy
/// beyond what the provider SDK itself applies.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use nexus_storage::{StorageBackend, error::Result};
///
/// async fn fetch_if_present(backend: &dyn StorageBackend, key: &str) -> Result<bool> {
///     if backend.exists(key).await? {
///         backend.get(key, Path::new("model.pt")).await?;
///         return Ok(true);
///     }
///     Ok(false)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Upload a local file to a remote key, overwriting any existing object.
    ///
    /// The key is recorded in the index only after this returns `Ok`, so a
    /// failed upload never leaves a dangling index entry.
    async fn put(&self, local_path: &Path, remote_key: &str) -> Result<()>;

    /// Download a remote key to a local file, creating parent directories
    /// as needed. Returns [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if the key does not exist.
    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<()>;

    /// Check whether a remote key exists.
    async fn exists(&self, remote_key: &str) -> Result<bool>;
}

const S3_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const S3_KEY_SECRET: &str = "AWS_SECRET_ACCESS_KEY";
const S3_REGION: &str = "AWS_REGION";
const S3_ENDPOINT: &str = "AWS_ENDPOINT_URL";
const DEFAULT_S3_REGION: &str = "us-east-1";

const GCS_KEY_ID: &str = "GCS_ACCESS_KEY_ID";
const GCS_KEY_SECRET: &str = "GCS_SECRET_ACCESS_KEY";

/// Build the backend selected by the repository configuration.
///
/// Provider and bucket are read lazily here — an invalid `provider` or a
/// missing `bucket` fails at this point, not when the config was loaded,
/// and the config error is preserved as a child frame. Credentials come
/// from the environment; anything smarter (profiles, credential chains,
/// refresh) belongs to the operator, not this crate.
pub fn for_provider(config: &Config) -> Result<BackendHandle> {
    let provider = config.provider().map_err(ErrorKind::config)?;
    let bucket = config.bucket().map_err(ErrorKind::config)?;
    let handle: BackendHandle = match provider {
        CloudProvider::S3 => {
            let key_id = require_env(S3_KEY_ID)?;
            let key_secret = require_env(S3_KEY_SECRET)?;
            let region = std::env::var(S3_REGION).unwrap_or_else(|_| DEFAULT_S3_REGION.to_string());
            let endpoint = std::env::var(S3_ENDPOINT).ok();
            Arc::new(S3Backend::new("s3", bucket, region, endpoint, key_id, key_secret))
        },
        CloudProvider::Gcs => {
            let key_id = require_env(GCS_KEY_ID)?;
            let key_secret = require_env(GCS_KEY_SECRET)?;
            Arc::new(GcsBackend::new("gcs", bucket, key_id, key_secret))
        },
    };
    tracing::debug!(backend = handle.name(), %provider, bucket, "selected storage backend");
    Ok(handle)
}

fn require_env(name: &'static str) -> Result<String> {
    std::env::var(name).or_raise(|| ErrorKind::Credentials(format!("{name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_config::CONFIG_FILE;

    fn config_from(contents: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), contents).unwrap();
        Config::load(dir.path()).unwrap()
    }

    #[test]
    fn test_invalid_provider_surfaces_as_config_error() {
        let config = config_from("provider: rsync\nbucket: test\n");
        let err = for_provider(&config).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Config));
    }

    #[test]
    fn test_missing_bucket_surfaces_as_config_error() {
        let config = config_from("provider: s3\n");
        let err = for_provider(&config).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Config));
    }
}
