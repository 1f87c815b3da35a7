//! Hash algorithms

use crate::error::{Error, Result};
use const_oid::db::rfc5912::{ID_SHA_256, ID_SHA_384, ID_SHA_512};
use const_oid::ObjectIdentifier;
use sha2::{Digest, Sha256, Sha384, Sha512};
use sigcheck_types::{ProtoHashAlgorithm, Sha256Hash};

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Map an ASN.1 digest algorithm identifier
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == ID_SHA_256 {
            Ok(HashAlgorithm::Sha256)
        } else if *oid == ID_SHA_384 {
            Ok(HashAlgorithm::Sha384)
        } else if *oid == ID_SHA_512 {
            Ok(HashAlgorithm::Sha512)
        } else {
            Err(Error::UnsupportedAlgorithm(format!("digest algorithm {}", oid)))
        }
    }

    /// Map a protobuf `HashAlgorithm`
    pub fn from_proto(alg: ProtoHashAlgorithm) -> Result<Self> {
        match alg {
            ProtoHashAlgorithm::Sha2256 => Ok(HashAlgorithm::Sha256),
            ProtoHashAlgorithm::Sha2384 => Ok(HashAlgorithm::Sha384),
            ProtoHashAlgorithm::Sha2512 => Ok(HashAlgorithm::Sha512),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "hash algorithm {}",
                other.as_str_name()
            ))),
        }
    }
}

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256Hash::from_bytes(Sha256::digest(data).into())
}
