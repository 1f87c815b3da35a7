//! Artifacts handed to verification
//!
//! An artifact is either its raw bytes or a pre-computed SHA-256 digest,
//! so large files need not be held in memory.

use crate::Sha256Hash;

/// An artifact to be verified against a bundle
///
/// ```
/// use sigcheck_types::{Artifact, Sha256Hash};
///
/// let artifact = Artifact::from(b"hello world".as_slice());
/// assert!(artifact.bytes().is_some());
///
/// let digest = Sha256Hash::from_hex(
///     "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
/// ).unwrap();
/// let artifact = Artifact::from(digest);
/// assert!(artifact.bytes().is_none());
/// ```
#[derive(Debug, Clone)]
pub enum Artifact<'a> {
    Bytes(&'a [u8]),
    Digest(Sha256Hash),
}

impl<'a> Artifact<'a> {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Artifact::Bytes(bytes) => Some(bytes),
            Artifact::Digest(_) => None,
        }
    }

    pub fn pre_computed_digest(&self) -> Option<Sha256Hash> {
        match self {
            Artifact::Bytes(_) => None,
            Artifact::Digest(hash) => Some(*hash),
        }
    }
}

impl<'a> From<&'a [u8]> for Artifact<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Artifact::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Artifact<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Artifact::Bytes(bytes.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Artifact<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Artifact::Bytes(bytes.as_slice())
    }
}

impl From<Sha256Hash> for Artifact<'static> {
    fn from(hash: Sha256Hash) -> Self {
        Artifact::Digest(hash)
    }
}
