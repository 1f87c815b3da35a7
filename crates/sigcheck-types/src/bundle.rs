//! Sigstore bundle model
//!
//! The bundle is consumed read-only by verification. It carries the signing
//! certificate (or chain), the signed content (a message signature or a DSSE
//! envelope), transparency log entries and optional RFC 3161 timestamps.
//!
//! The wire types are the official Sigstore protobuf types, re-exported
//! here. [`BundleExt`] and the other extension traits add decoding with
//! shape checks and the accessors verification uses.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

// Re-export protobuf types
pub use sigstore_protobuf_specs::dev::sigstore::{
    bundle::v1::{
        bundle::Content as BundleContent,
        verification_material::Content as VerificationMaterialContent, Bundle,
        TimestampVerificationData, VerificationMaterial,
    },
    common::v1::{
        HashAlgorithm as ProtoHashAlgorithm, HashOutput, LogId, MessageSignature,
        PublicKeyIdentifier, Rfc3161SignedTimestamp, X509Certificate, X509CertificateChain,
    },
    rekor::v1::{
        Checkpoint as ProtoCheckpoint, InclusionPromise, InclusionProof, KindVersion,
        TransparencyLogEntry,
    },
};

// Re-export DSSE envelope from intoto
pub use sigstore_protobuf_specs::io::intoto::{
    Envelope as DsseEnvelope, Signature as DsseSignature,
};

/// Sigstore bundle media types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Bundle format version 0.1
    Bundle0_1,
    /// Bundle format version 0.2
    Bundle0_2,
    /// Bundle format version 0.3
    Bundle0_3,
}

impl MediaType {
    /// Get the media type string
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Bundle0_1 => "application/vnd.dev.sigstore.bundle+json;version=0.1",
            MediaType::Bundle0_2 => "application/vnd.dev.sigstore.bundle+json;version=0.2",
            MediaType::Bundle0_3 => "application/vnd.dev.sigstore.bundle.v0.3+json",
        }
    }

    /// The format version this media type names
    pub fn version(&self) -> BundleVersion {
        match self {
            MediaType::Bundle0_1 => BundleVersion::new(0, 1),
            MediaType::Bundle0_2 => BundleVersion::new(0, 2),
            MediaType::Bundle0_3 => BundleVersion::new(0, 3),
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "application/vnd.dev.sigstore.bundle+json;version=0.1" => Ok(MediaType::Bundle0_1),
            "application/vnd.dev.sigstore.bundle+json;version=0.2" => Ok(MediaType::Bundle0_2),
            "application/vnd.dev.sigstore.bundle.v0.3+json" => Ok(MediaType::Bundle0_3),
            "application/vnd.dev.sigstore.bundle+json;version=0.3" => Ok(MediaType::Bundle0_3),
            _ => Err(Error::InvalidMediaType(s.to_string())),
        }
    }
}

/// A `major.minor` bundle format version
///
/// Ordering is semantic: `0.10` sorts after `0.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BundleVersion {
    pub major: u32,
    pub minor: u32,
}

impl BundleVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for BundleVersion {
    type Err = Error;

    /// Accepts `0.3` and `v0.3`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let (major, minor) = trimmed
            .split_once('.')
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;
        let major = major
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Extension trait for Bundle with helper methods
pub trait BundleExt {
    /// Parse a bundle from JSON
    ///
    /// Protobuf JSON leaves every message field optional. Fields a bundle
    /// cannot be verified without are required here.
    fn from_json(json: &str) -> Result<Bundle>;

    /// Serialize the bundle to JSON
    fn to_json(&self) -> Result<String>;

    /// Get the bundle media type
    fn bundle_media_type(&self) -> Result<MediaType>;

    /// Get the bundle format version from the media type
    fn version(&self) -> Result<BundleVersion>;

    /// Whether this bundle's format version is at least `min`
    fn min_version(&self, min: &str) -> Result<bool>;

    /// Get the DER signing certificate, if the bundle is certificate-based
    fn signing_certificate(&self) -> Option<&[u8]>;

    /// Get the transparency log entries
    fn tlog_entries(&self) -> &[TransparencyLogEntry];

    /// Get the RFC 3161 timestamps
    fn timestamps(&self) -> &[Rfc3161SignedTimestamp];

    /// Get the signed content
    fn signed_content(&self) -> Result<&BundleContent>;

    /// Get the message signature if present
    fn message_signature(&self) -> Option<&MessageSignature>;

    /// Get the DSSE envelope if present
    fn dsse_envelope(&self) -> Option<&DsseEnvelope>;

    /// The raw signature bytes timestamps are issued over
    ///
    /// For DSSE this is the first envelope signature.
    fn signature_bytes(&self) -> Option<&[u8]>;
}

impl BundleExt for Bundle {
    fn from_json(json: &str) -> Result<Bundle> {
        let bundle: Bundle = serde_json::from_str(json).map_err(Error::Json)?;
        check_shape(&bundle)?;
        Ok(bundle)
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Json)
    }

    fn bundle_media_type(&self) -> Result<MediaType> {
        MediaType::from_str(&self.media_type)
    }

    fn version(&self) -> Result<BundleVersion> {
        Ok(self.bundle_media_type()?.version())
    }

    fn min_version(&self, min: &str) -> Result<bool> {
        let min = BundleVersion::from_str(min)?;
        Ok(self.version()? >= min)
    }

    fn signing_certificate(&self) -> Option<&[u8]> {
        let vm = self.verification_material.as_ref()?;
        match vm.content.as_ref()? {
            VerificationMaterialContent::Certificate(cert) => Some(&cert.raw_bytes),
            VerificationMaterialContent::X509CertificateChain(chain) => {
                chain.certificates.first().map(|c| c.raw_bytes.as_slice())
            }
            VerificationMaterialContent::PublicKey(_) => None,
        }
    }

    fn tlog_entries(&self) -> &[TransparencyLogEntry] {
        self.verification_material
            .as_ref()
            .map(|vm| vm.tlog_entries.as_slice())
            .unwrap_or(&[])
    }

    fn timestamps(&self) -> &[Rfc3161SignedTimestamp] {
        self.verification_material
            .as_ref()
            .and_then(|vm| vm.timestamp_verification_data.as_ref())
            .map(|tvd| tvd.rfc3161_timestamps.as_slice())
            .unwrap_or(&[])
    }

    fn signed_content(&self) -> Result<&BundleContent> {
        self.content
            .as_ref()
            .ok_or_else(|| Error::MissingField("messageSignature or dsseEnvelope".to_string()))
    }

    fn message_signature(&self) -> Option<&MessageSignature> {
        match &self.content {
            Some(BundleContent::MessageSignature(sig)) => Some(sig),
            _ => None,
        }
    }

    fn dsse_envelope(&self) -> Option<&DsseEnvelope> {
        match &self.content {
            Some(BundleContent::DsseEnvelope(env)) => Some(env),
            _ => None,
        }
    }

    fn signature_bytes(&self) -> Option<&[u8]> {
        match self.content.as_ref()? {
            BundleContent::MessageSignature(sig) => Some(&sig.signature),
            BundleContent::DsseEnvelope(env) => env.signatures.first().map(|s| s.sig.as_slice()),
        }
    }
}

fn check_shape(bundle: &Bundle) -> Result<()> {
    let vm = bundle
        .verification_material
        .as_ref()
        .ok_or_else(|| Error::MissingField("verificationMaterial".to_string()))?;
    if vm.content.is_none() {
        return Err(Error::MissingField(
            "verificationMaterial certificate, x509CertificateChain or publicKey".to_string(),
        ));
    }
    bundle.signed_content()?;

    for (i, entry) in vm.tlog_entries.iter().enumerate() {
        if entry.log_id.is_none() {
            return Err(Error::MissingField(format!("tlogEntries[{}].logId", i)));
        }
        if entry.kind_version.is_none() {
            return Err(Error::MissingField(format!("tlogEntries[{}].kindVersion", i)));
        }
        if let Some(proof) = &entry.inclusion_proof {
            if proof.checkpoint.is_none() {
                return Err(Error::MissingField(format!(
                    "tlogEntries[{}].inclusionProof.checkpoint",
                    i
                )));
            }
        }
    }
    Ok(())
}

/// Extension trait for TransparencyLogEntry
pub trait TransparencyLogEntryExt {
    /// Get the log ID as lowercase hex, empty when absent
    fn log_id_hex(&self) -> String;

    /// Get the entry kind and version, e.g. `("hashedrekord", "0.0.1")`
    fn kind_and_version(&self) -> Option<(&str, &str)>;
}

impl TransparencyLogEntryExt for TransparencyLogEntry {
    fn log_id_hex(&self) -> String {
        self.log_id
            .as_ref()
            .map(|id| hex::encode(&id.key_id))
            .unwrap_or_default()
    }

    fn kind_and_version(&self) -> Option<(&str, &str)> {
        self.kind_version
            .as_ref()
            .map(|kv| (kv.kind.as_str(), kv.version.as_str()))
    }
}

/// Extension trait for InclusionProof
pub trait InclusionProofExt {
    /// Get the signed-note checkpoint text
    fn checkpoint_text(&self) -> Result<&str>;
}

impl InclusionProofExt for InclusionProof {
    fn checkpoint_text(&self) -> Result<&str> {
        self.checkpoint
            .as_ref()
            .map(|c| c.envelope.as_str())
            .ok_or_else(|| Error::MissingField("checkpoint".to_string()))
    }
}

/// Extension trait for DsseEnvelope
pub trait DsseEnvelopeExt {
    /// Get the Pre-Authentication Encoding, the bytes actually signed
    fn pae(&self) -> Vec<u8>;
}

impl DsseEnvelopeExt for DsseEnvelope {
    fn pae(&self) -> Vec<u8> {
        pae(&self.payload_type, &self.payload)
    }
}

/// Compute the Pre-Authentication Encoding (PAE)
///
/// Format: `DSSEv1 <len(type)> <type> <len(body)> <body>`
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!(
        "DSSEv1 {} {} {} ",
        payload_type.len(),
        payload_type,
        payload.len()
    );
    let mut result = Vec::with_capacity(header.len() + payload.len());
    result.extend_from_slice(header.as_bytes());
    result.extend_from_slice(payload);
    result
}

/// Extension trait for HashOutput
pub trait HashOutputExt {
    /// Get the declared hash algorithm
    fn hash_algorithm(&self) -> ProtoHashAlgorithm;
}

impl HashOutputExt for HashOutput {
    fn hash_algorithm(&self) -> ProtoHashAlgorithm {
        ProtoHashAlgorithm::try_from(self.algorithm).unwrap_or(ProtoHashAlgorithm::Unspecified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V03: &str = r#"{
        "mediaType": "application/vnd.dev.sigstore.bundle.v0.3+json",
        "verificationMaterial": {
            "certificate": {"rawBytes": "MIIB"},
            "tlogEntries": [{
                "logIndex": "25",
                "logId": {"keyId": "AAEC"},
                "kindVersion": {"kind": "hashedrekord", "version": "0.0.1"},
                "integratedTime": "1709294700",
                "inclusionPromise": {"signedEntryTimestamp": "MEUC"},
                "canonicalizedBody": "e30="
            }]
        },
        "messageSignature": {
            "messageDigest": {"algorithm": "SHA2_256", "digest": "AAAA"},
            "signature": "MEYC"
        }
    }"#;

    #[test]
    fn test_media_type_parsing() {
        assert_eq!(
            MediaType::from_str("application/vnd.dev.sigstore.bundle+json;version=0.1").unwrap(),
            MediaType::Bundle0_1
        );
        assert_eq!(
            MediaType::from_str("application/vnd.dev.sigstore.bundle+json;version=0.2").unwrap(),
            MediaType::Bundle0_2
        );
        assert_eq!(
            MediaType::from_str("application/vnd.dev.sigstore.bundle.v0.3+json").unwrap(),
            MediaType::Bundle0_3
        );
        assert!(MediaType::from_str("application/json").is_err());
    }

    #[test]
    fn test_version_ordering_is_semantic() {
        let v09: BundleVersion = "0.9".parse().unwrap();
        let v010: BundleVersion = "v0.10".parse().unwrap();
        let v1: BundleVersion = "1.0".parse().unwrap();
        assert!(v09 < v010);
        assert!(v010 < v1);
        assert!("0".parse::<BundleVersion>().is_err());
        assert!("0.x".parse::<BundleVersion>().is_err());
    }

    #[test]
    fn test_bundle_decoding() {
        let bundle = Bundle::from_json(V03).unwrap();
        assert_eq!(bundle.version().unwrap(), BundleVersion::new(0, 3));
        assert_eq!(bundle.signing_certificate(), Some([0x30, 0x82, 0x01].as_slice()));

        let entry = &bundle.tlog_entries()[0];
        assert_eq!(entry.log_index, 25);
        assert_eq!(entry.integrated_time, 1_709_294_700);
        assert_eq!(entry.log_id_hex(), "000102");
        assert_eq!(entry.kind_and_version(), Some(("hashedrekord", "0.0.1")));
        assert_eq!(entry.canonicalized_body, b"{}");
        assert!(entry.inclusion_proof.is_none());

        let sig = bundle.message_signature().unwrap();
        let digest = sig.message_digest.as_ref().unwrap();
        assert_eq!(digest.hash_algorithm(), ProtoHashAlgorithm::Sha2256);
        assert!(bundle.dsse_envelope().is_none());
        assert!(bundle.timestamps().is_empty());
        assert_eq!(bundle.signature_bytes(), Some([0x30, 0x46, 0x02].as_slice()));
    }

    #[test]
    fn test_min_version() {
        let bundle = Bundle::from_json(V03).unwrap();
        assert!(bundle.min_version("0.1").unwrap());
        assert!(bundle.min_version("0.3").unwrap());
        assert!(!bundle.min_version("0.4").unwrap());
        assert!(bundle.min_version("garbage").is_err());
    }

    #[test]
    fn test_unknown_media_type_is_rejected_by_version() {
        let json = V03.replace(
            "application/vnd.dev.sigstore.bundle.v0.3+json",
            "application/vnd.dev.sigstore.bundle+json;version=9.9",
        );
        let bundle = Bundle::from_json(&json).unwrap();
        assert!(matches!(bundle.version(), Err(Error::InvalidMediaType(_))));
    }

    #[test]
    fn test_required_fields_are_checked() {
        let mut value: serde_json::Value = serde_json::from_str(V03).unwrap();
        value.as_object_mut().unwrap().remove("messageSignature");
        let err = Bundle::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));

        let mut value: serde_json::Value = serde_json::from_str(V03).unwrap();
        value["verificationMaterial"]
            .as_object_mut()
            .unwrap()
            .remove("certificate");
        assert!(matches!(
            Bundle::from_json(&value.to_string()),
            Err(Error::MissingField(_))
        ));

        let mut value: serde_json::Value = serde_json::from_str(V03).unwrap();
        value["verificationMaterial"]["tlogEntries"][0]
            .as_object_mut()
            .unwrap()
            .remove("logId");
        let err = Bundle::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("tlogEntries[0].logId"));
    }

    #[test]
    fn test_pae() {
        let pae_result = pae("application/example", b"hello world");
        assert_eq!(pae_result, b"DSSEv1 19 application/example 11 hello world");
    }

    #[test]
    fn test_envelope_decoding() {
        let json = r#"{
            "payload": "aGk=",
            "payloadType": "text/plain",
            "signatures": [{"sig": "AQ==", "keyid": ""}]
        }"#;
        let env: DsseEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.payload, b"hi");
        assert_eq!(env.signatures[0].sig, vec![1]);
        assert_eq!(env.pae(), b"DSSEv1 10 text/plain 2 hi");
    }
}
