//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), MinIO and
//! others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly at construction time (the factory
//! reads them from the environment). No credential chains or profiles —
//! that's the operator's job.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    primitives::ByteStream,
};
use std::io::Error as IoError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 16;

/// S3-compatible storage backend.
///
/// Transfers objects to and from an S3 bucket. Custom endpoints select
/// S3-compatible services other than AWS; path-style addressing is forced
/// for compatibility with those services.
///
/// # Examples
///
/// ```no_run
/// use nexus_storage::backend::S3Backend;
///
/// let backend = S3Backend::new(
///     "s3",
///     "my-model-bucket",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(key_id, key_secret, None, None, "nexus-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        // Set custom endpoint for non-AWS services
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        // unwrap is safe: semaphore is never closed
        self.rate_limiter.clone().acquire_owned().await.unwrap()
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, local_path: &Path, remote_key: &str) -> Result<()> {
        let key = validate_key(remote_key)?;
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|err| ErrorKind::Io(IoError::other(err)))?;
        let _permit = self.acquire_permit().await;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|err| ErrorKind::Network(err.into_service_error().to_string()))?;
        tracing::debug!(backend = self.name.as_str(), key = key.as_str(), "uploaded object");
        Ok(())
    }

    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<()> {
        let key = validate_key(remote_key)?;
        let _permit = self.acquire_permit().await;
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                match service.is_no_such_key() {
                    true => ErrorKind::NotFound(key.clone()),
                    false => ErrorKind::Network(service.to_string()),
                }
            })?;
        let data = response
            .body
            .collect()
            .await
            .map_err(|err| ErrorKind::Network(err.to_string()))?
            .into_bytes();
        if let Some(parent) = local_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        tokio::fs::write(local_path, &data).await.map_err(ErrorKind::Io)?;
        tracing::debug!(backend = self.name.as_str(), key = key.as_str(), "downloaded object");
        Ok(())
    }

    async fn exists(&self, remote_key: &str) -> Result<bool> {
        let key = validate_key(remote_key)?;
        let _permit = self.acquire_permit().await;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service = err.into_service_error();
                match service.is_not_found() {
                    true => Ok(false),
                    false => exn::bail!(ErrorKind::Network(service.to_string())),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_is_offline() {
        // Building a client never talks to the network.
        let backend = S3Backend::new("s3", "bucket", "us-east-1", None, "key", "secret");
        assert_eq!(backend.name(), "s3");
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_key() {
        let backend = S3Backend::new("s3", "bucket", "us-east-1", None, "key", "secret");
        let err = backend.put(Path::new("model.pt"), "../escape").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_put_missing_local_file_is_io_error() {
        let backend = S3Backend::new("s3", "bucket", "us-east-1", None, "key", "secret");
        let err = backend.put(Path::new("/definitely/not/here.pt"), "m/v.pt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }
}
