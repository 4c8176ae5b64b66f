//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Ideal
/// for unit tests that need a [`StorageBackend`] without network
/// dependencies.
///
/// # Examples
///
/// ```
/// use nexus_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_objects([
///     ("test_model/abc123.pt", b"weights".to_vec()),
/// ]);
/// assert!(backend.exists("test_model/abc123.pt").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, Vec<u8>>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                // The panic here is DELIBERATE. MockBackend is intended to
                // be used in tests; panics are expected.
                panic!("MockBackend::with_objects: invalid key {key}");
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Snapshot of the raw bytes stored at a key, if any.
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.storage.read().await.get(key).cloned()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, Vec<u8>); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, local_path: &Path, remote_key: &str) -> Result<()> {
        let key = validate_key(remote_key)?;
        let data = tokio::fs::read(local_path).await.map_err(ErrorKind::Io)?;
        self.storage.write().await.insert(key, data);
        Ok(())
    }

    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<()> {
        let key = validate_key(remote_key)?;
        let data = self
            .storage
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        if let Some(parent) = local_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        tokio::fs::write(local_path, &data).await.map_err(ErrorKind::Io)?;
        Ok(())
    }

    async fn exists(&self, remote_key: &str) -> Result<bool> {
        let key = validate_key(remote_key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }
}
