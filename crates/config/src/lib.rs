//! Repository-local configuration for nexus.
//!
//! A project opts into nexus by dropping a `.nexusrc` file (YAML) into its
//! root:
//!
//! ```yaml
//! provider: s3
//! bucket: my-model-bucket
//! ```
//!
//! Values can be overridden through `NEXUS_`-prefixed environment variables
//! (`NEXUS_PROVIDER`, `NEXUS_BUCKET`).
//!
//! # Lazy validation
//! [`Config::load`] only gathers raw values; nothing is validated until a
//! field is actually read. A config file with `provider: hotdog` loads fine
//! and only fails when [`Config::provider`] is called, and a missing `bucket`
//! only fails [`Config::bucket`]. This keeps commands that never touch
//! storage working against half-written config files.

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the repository-local configuration file.
pub const CONFIG_FILE: &str = ".nexusrc";
/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "NEXUS_";

/// The closed set of storage providers this build knows how to talk to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    /// Amazon S3 or any S3-compatible service.
    #[display("s3")]
    S3,
    /// Google Cloud Storage (via its S3-interoperability API).
    #[display("gcs")]
    Gcs,
}

/// Raw values exactly as found in the file/environment. All optional so
/// that no validation can happen before the accessors run.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    provider: Option<String>,
    bucket: Option<String>,
}

/// Repository-local configuration with validate-on-access semantics.
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    raw: RawConfig,
}

impl Config {
    /// Read `.nexusrc` from the given project root, merged with `NEXUS_*`
    /// environment variables. A missing file is not an error.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self> {
        let path = project_root.as_ref().join(CONFIG_FILE);
        let mut figment = Figment::new();
        if path.is_file() {
            // file_exact: the config is repository-local, never searched
            // for up the directory tree.
            figment = figment.merge(Yaml::file_exact(&path));
        }
        let raw = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract::<RawConfig>()
            .or_raise(|| ErrorKind::Unreadable(path.clone()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(Self { path, raw })
    }

    /// The configured storage provider. Defaults to S3 when absent; an
    /// unrecognized literal fails here, not at load time.
    pub fn provider(&self) -> Result<CloudProvider> {
        match self.raw.provider.as_deref() {
            None => Ok(CloudProvider::S3),
            Some("s3") => Ok(CloudProvider::S3),
            Some("gcs") => Ok(CloudProvider::Gcs),
            Some(other) => exn::bail!(ErrorKind::InvalidProvider(other.to_string())),
        }
    }

    /// The configured bucket name. No default; fails when absent.
    pub fn bucket(&self) -> Result<&str> {
        self.raw.bucket.as_deref().ok_or_raise(|| ErrorKind::MissingBucket)
    }

    /// Location the configuration was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn write_config(dir: &Path, contents: &str) {
        fs::write(dir.join(CONFIG_FILE), contents).unwrap();
    }

    #[rstest]
    #[case("provider: s3\nbucket: my-s3-bucket\n", CloudProvider::S3, "my-s3-bucket")]
    #[case("provider: gcs\nbucket: my-gcs-bucket\n", CloudProvider::Gcs, "my-gcs-bucket")]
    fn test_load_provider_and_bucket(
        #[case] contents: &str,
        #[case] provider: CloudProvider,
        #[case] bucket: &str,
    ) {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), contents);
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.provider().unwrap(), provider);
        assert_eq!(config.bucket().unwrap(), bucket);
    }

    #[test]
    fn test_missing_bucket_fails_only_on_access() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "provider: s3\n");
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.provider().unwrap(), CloudProvider::S3);
        let err = config.bucket().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingBucket));
    }

    #[test]
    fn test_invalid_provider_fails_only_on_access() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "provider: hotdog\nbucket: test\n");
        // Load must succeed: validation is lazy.
        let config = Config::load(dir.path()).unwrap();
        let err = config.provider().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidProvider(literal) if literal == "hotdog"));
        // Other fields stay readable.
        assert_eq!(config.bucket().unwrap(), "test");
    }

    #[test]
    fn test_default_provider_is_s3() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "bucket: test-bucket\n");
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.provider().unwrap(), CloudProvider::S3);
    }

    #[test]
    fn test_no_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.provider().unwrap(), CloudProvider::S3);
        let err = config.bucket().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingBucket));
    }

    #[test]
    fn test_malformed_yaml_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "provider: [unterminated\n");
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }
}
