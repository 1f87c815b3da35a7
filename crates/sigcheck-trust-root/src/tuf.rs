//! Trusted root distribution over TUF
//!
//! [`TufSource`] fetches `trusted_root.json` from a TUF repository, verifying
//! the repository metadata against a caller-supplied bootstrap `root.json`.
//! The fetch runs on a private current-thread runtime so callers stay
//! synchronous.
//!
//! ```no_run
//! use sigcheck_trust_root::{TrustedRoot, TufConfig, TufSource};
//!
//! # fn example(bootstrap: Vec<u8>) -> Result<(), sigcheck_trust_root::Error> {
//! let source = TufSource::new(TufConfig::new("https://tuf.example.com"), bootstrap);
//! let root = TrustedRoot::from_source(&source)?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tough::{HttpTransport, IntoVec, RepositoryLoader, TargetName};
use url::Url;

use crate::source::TrustRootSource;
use crate::{Error, Result};

/// TUF target name for the trusted root
pub const TRUSTED_ROOT_TARGET: &str = "trusted_root.json";

/// Configuration for TUF fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TufConfig {
    /// Base URL for the TUF repository
    pub url: String,
    /// Local cache directory; a platform default is used when unset
    pub cache_dir: Option<PathBuf>,
    /// Read the previously cached target instead of contacting the repository
    pub offline: bool,
}

impl TufConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_dir: None,
            offline: false,
        }
    }

    pub fn with_cache_dir(mut self, path: PathBuf) -> Self {
        self.cache_dir = Some(path);
        self
    }

    /// Skip the network and use the cached trusted root
    ///
    /// The cached copy was verified when downloaded, but its freshness is
    /// not checked.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let project_dirs = directories::ProjectDirs::from("dev", "sigcheck", "sigcheck")
            .ok_or_else(|| Error::Tuf("could not determine cache directory".into()))?;
        Ok(project_dirs.cache_dir().join("tuf"))
    }
}

/// A [`TrustRootSource`] backed by a TUF repository
///
/// An online fetch stores the verified target in the cache directory and
/// fails if it cannot, so a later offline fetch never sees a stale copy
/// after a successful online one.
#[derive(Debug, Clone)]
pub struct TufSource {
    config: TufConfig,
    root_json: Vec<u8>,
}

impl TufSource {
    /// `root_json` is the TUF root metadata used to bootstrap trust
    pub fn new(config: TufConfig, root_json: Vec<u8>) -> Self {
        Self { config, root_json }
    }

    pub fn config(&self) -> &TufConfig {
        &self.config
    }

    async fn fetch_online(&self, cache_dir: PathBuf) -> Result<Vec<u8>> {
        let base_url = Url::parse(&self.config.url).map_err(|e| Error::Tuf(e.to_string()))?;
        let targets_url = base_url.join("targets/").map_err(|e| Error::Tuf(e.to_string()))?;

        let metadata_dir = cache_dir.join("metadata");
        tokio::fs::create_dir_all(&metadata_dir)
            .await
            .map_err(|e| Error::Tuf(format!("failed to create cache directory: {}", e)))?;

        let repo = RepositoryLoader::new(&self.root_json, base_url, targets_url)
            .transport(HttpTransport::default())
            .datastore(metadata_dir)
            .load()
            .await
            .map_err(|e| Error::Tuf(format!("TUF repository load failed: {}", e)))?;

        let target = TargetName::new(TRUSTED_ROOT_TARGET)
            .map_err(|e| Error::Tuf(format!("invalid target name: {}", e)))?;
        let stream = repo
            .read_target(&target)
            .await
            .map_err(|e| Error::Tuf(format!("failed to read target: {}", e)))?
            .ok_or_else(|| Error::Tuf(format!("target not found: {}", TRUSTED_ROOT_TARGET)))?;
        let bytes = stream
            .into_vec()
            .await
            .map_err(|e| Error::Tuf(format!("failed to read target contents: {}", e)))?;

        cache_target(&cache_dir, &bytes).await?;
        Ok(bytes)
    }

    fn fetch_offline(&self, cache_dir: PathBuf) -> Result<Vec<u8>> {
        let cached = cache_dir.join("targets").join(TRUSTED_ROOT_TARGET);
        std::fs::read(&cached).map_err(|e| {
            Error::Tuf(format!(
                "no cached {} at {} (offline mode): {}",
                TRUSTED_ROOT_TARGET,
                cached.display(),
                e
            ))
        })
    }
}

async fn cache_target(cache_dir: &Path, bytes: &[u8]) -> Result<()> {
    let targets_dir = cache_dir.join("targets");
    tokio::fs::create_dir_all(&targets_dir)
        .await
        .map_err(|e| Error::Tuf(format!("failed to create cache directory: {}", e)))?;
    tokio::fs::write(targets_dir.join(TRUSTED_ROOT_TARGET), bytes)
        .await
        .map_err(|e| Error::Tuf(format!("failed to cache trusted root: {}", e)))
}

impl TrustRootSource for TufSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        let cache_dir = self.config.cache_dir()?;
        if self.config.offline {
            tracing::debug!(cache = %cache_dir.display(), "reading cached trusted root");
            return self.fetch_offline(cache_dir);
        }

        tracing::debug!(url = %self.config.url, "fetching trusted root via TUF");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Tuf(format!("failed to start runtime: {}", e)))?;
        runtime.block_on(self.fetch_online(cache_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuf_config_builder() {
        let config = TufConfig::new("https://tuf.example.com")
            .with_cache_dir(PathBuf::from("/tmp/test"))
            .offline();
        assert_eq!(config.url, "https://tuf.example.com");
        assert!(config.offline);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/test"));
    }

    #[test]
    fn test_offline_reads_cached_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("targets")).unwrap();
        let cached = dir.path().join("targets").join(TRUSTED_ROOT_TARGET);
        std::fs::write(cached, b"cached").unwrap();

        let config = TufConfig::new("https://tuf.example.com")
            .with_cache_dir(dir.path().to_path_buf())
            .offline();
        let source = TufSource::new(config, Vec::new());
        assert_eq!(source.fetch().unwrap(), b"cached");
    }

    #[test]
    fn test_offline_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = TufConfig::new("https://tuf.example.com")
            .with_cache_dir(dir.path().to_path_buf())
            .offline();
        let source = TufSource::new(config, Vec::new());
        assert!(matches!(source.fetch(), Err(Error::Tuf(_))));
    }

    #[test]
    fn test_invalid_url_is_tuf_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TufConfig::new("not a url").with_cache_dir(dir.path().to_path_buf());
        let source = TufSource::new(config, Vec::new());
        assert!(matches!(source.fetch(), Err(Error::Tuf(_))));
    }

    #[tokio::test]
    async fn test_cached_target_is_read_back_offline() {
        let dir = tempfile::tempdir().unwrap();
        cache_target(dir.path(), b"fresh").await.unwrap();

        let config = TufConfig::new("https://tuf.example.com")
            .with_cache_dir(dir.path().to_path_buf())
            .offline();
        let source = TufSource::new(config, Vec::new());
        assert_eq!(source.fetch().unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_tuf_error() {
        let dir = tempfile::tempdir().unwrap();
        // a plain file where the targets directory belongs
        std::fs::write(dir.path().join("targets"), b"").unwrap();
        let result = cache_target(dir.path(), b"fresh").await;
        assert!(matches!(result, Err(Error::Tuf(_))));
    }
}
