//! Where trusted root bytes come from
//!
//! Every source yields raw document bytes; all of them go through the same
//! parser in [`crate::TrustedRoot::from_source`].

use crate::Result;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A provider of serialized trusted root documents
pub trait TrustRootSource {
    fn fetch(&self) -> Result<Vec<u8>>;
}

/// A trusted root stored on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrustRootSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        tracing::debug!(path = %self.path.display(), "reading trusted root");
        Ok(std::fs::read(&self.path)?)
    }
}

/// A trusted root supplied in memory, e.g. a default compiled into the caller
#[derive(Debug, Clone)]
pub struct BytesSource {
    bytes: Cow<'static, [u8]>,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Cow::Owned(bytes.into()),
        }
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
        }
    }
}

impl TrustRootSource for BytesSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_bytes_source() {
        let source = BytesSource::from_static(b"{}");
        assert_eq!(source.fetch().unwrap(), b"{}");
    }

    #[test]
    fn test_missing_file() {
        let source = FileSource::new("/nonexistent/trusted_root.json");
        assert!(matches!(source.fetch(), Err(Error::Io(_))));
    }
}
