//! Signature schemes and public keys
//!
//! The supported set is closed: ECDSA over P-256 and P-384, each with
//! SHA-256 or SHA-384. Anything else is rejected at key construction or
//! scheme selection so callers never see a half-understood key.

use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::x509::extract_ec_curve_oid;
use const_oid::db::rfc5912::{ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, SECP_256_R_1, SECP_384_R_1};
use const_oid::ObjectIdentifier;
use der::Decode;
use signature::hazmat::PrehashVerifier;
use spki::SubjectPublicKeyInfoOwned;

/// Elliptic curves keys may live on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
}

impl Curve {
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == SECP_256_R_1 {
            Ok(Curve::P256)
        } else if *oid == SECP_384_R_1 {
            Ok(Curve::P384)
        } else {
            Err(Error::UnsupportedAlgorithm(format!("elliptic curve {}", oid)))
        }
    }
}

/// A (curve, hash) combination accepted for signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    EcdsaP256Sha256,
    EcdsaP256Sha384,
    EcdsaP384Sha256,
    EcdsaP384Sha384,
}

impl SigningScheme {
    pub fn curve(&self) -> Curve {
        match self {
            SigningScheme::EcdsaP256Sha256 | SigningScheme::EcdsaP256Sha384 => Curve::P256,
            SigningScheme::EcdsaP384Sha256 | SigningScheme::EcdsaP384Sha384 => Curve::P384,
        }
    }

    pub fn hash(&self) -> HashAlgorithm {
        match self {
            SigningScheme::EcdsaP256Sha256 | SigningScheme::EcdsaP384Sha256 => {
                HashAlgorithm::Sha256
            }
            SigningScheme::EcdsaP256Sha384 | SigningScheme::EcdsaP384Sha384 => {
                HashAlgorithm::Sha384
            }
        }
    }

    /// Scheme for a signature made by a key on `curve` using the X.509
    /// signature algorithm `sig_alg`
    pub fn from_curve_and_signature_oid(curve: Curve, sig_alg: &ObjectIdentifier) -> Result<Self> {
        let sha256 = *sig_alg == ECDSA_WITH_SHA_256;
        let sha384 = *sig_alg == ECDSA_WITH_SHA_384;
        match curve {
            Curve::P256 if sha256 => Ok(SigningScheme::EcdsaP256Sha256),
            Curve::P256 if sha384 => Ok(SigningScheme::EcdsaP256Sha384),
            Curve::P384 if sha256 => Ok(SigningScheme::EcdsaP384Sha256),
            Curve::P384 if sha384 => Ok(SigningScheme::EcdsaP384Sha384),
            _ => {
                tracing::warn!(
                    ?curve,
                    sig_alg = %sig_alg,
                    "unknown curve/signature algorithm combination"
                );
                Err(Error::UnsupportedAlgorithm(format!(
                    "signature algorithm {} for {:?} key",
                    sig_alg, curve
                )))
            }
        }
    }
}

/// An ECDSA verification key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let spki = SubjectPublicKeyInfoOwned::from_der(der).map_err(|e| {
            Error::InvalidKey(format!("failed to parse SubjectPublicKeyInfo: {}", e))
        })?;
        Self::from_spki(&spki)
    }

    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let curve = Curve::from_oid(&extract_ec_curve_oid(spki)?)?;
        let point = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::InvalidKey("public key bit string is not octet aligned".into()))?;

        match curve {
            Curve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::P256)
                .map_err(|e| Error::InvalidKey(format!("invalid P-256 point: {}", e))),
            Curve::P384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::P384)
                .map_err(|e| Error::InvalidKey(format!("invalid P-384 point: {}", e))),
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            PublicKey::P256(_) => Curve::P256,
            PublicKey::P384(_) => Curve::P384,
        }
    }

    /// The hash conventionally paired with this key's curve
    pub fn default_hash(&self) -> HashAlgorithm {
        match self {
            PublicKey::P256(_) => HashAlgorithm::Sha256,
            PublicKey::P384(_) => HashAlgorithm::Sha384,
        }
    }

    /// Verify a DER ECDSA signature over `message`, hashing it with `hash`
    pub fn verify(&self, message: &[u8], signature: &[u8], hash: HashAlgorithm) -> Result<()> {
        self.verify_prehash(&hash.digest(message), signature)
    }

    /// Verify a DER ECDSA signature over an already computed digest
    pub fn verify_prehash(&self, digest: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::P256(key) => {
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| Error::InvalidSignature(format!("malformed signature: {}", e)))?;
                key.verify_prehash(digest, &sig)
                    .map_err(|_| Error::InvalidSignature("ECDSA P-256 verification failed".into()))
            }
            PublicKey::P384(key) => {
                let sig = p384::ecdsa::Signature::from_der(signature)
                    .map_err(|e| Error::InvalidSignature(format!("malformed signature: {}", e)))?;
                key.verify_prehash(digest, &sig)
                    .map_err(|_| Error::InvalidSignature("ECDSA P-384 verification failed".into()))
            }
        }
    }

    /// Verify under an explicit scheme, rejecting a curve mismatch
    pub fn verify_with_scheme(
        &self,
        message: &[u8],
        signature: &[u8],
        scheme: SigningScheme,
    ) -> Result<()> {
        if scheme.curve() != self.curve() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{:?} signature cannot be checked with a {:?} key",
                scheme,
                self.curve()
            )));
        }
        self.verify(message, signature, scheme.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_mapping() {
        assert_eq!(
            SigningScheme::from_curve_and_signature_oid(Curve::P384, &ECDSA_WITH_SHA_384).unwrap(),
            SigningScheme::EcdsaP384Sha384
        );
        assert_eq!(SigningScheme::EcdsaP256Sha384.hash(), HashAlgorithm::Sha384);
        assert_eq!(SigningScheme::EcdsaP384Sha256.curve(), Curve::P384);

        let rsa_sha256 = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
        assert!(SigningScheme::from_curve_and_signature_oid(Curve::P256, &rsa_sha256).is_err());
    }

    #[test]
    fn test_unsupported_curve() {
        let secp256k1 = ObjectIdentifier::new_unwrap("1.3.132.0.10");
        assert!(matches!(Curve::from_oid(&secp256k1), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_garbage_spki_rejected() {
        assert!(matches!(
            PublicKey::from_spki_der(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(Error::InvalidKey(_))
        ));
    }
}
