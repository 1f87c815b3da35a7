//! Bundle model for sigcheck
//!
//! Bundle types are re-exported from the official Sigstore protobuf specs,
//! with extension traits providing decoding checks and the accessors
//! verification needs. Also here: the in-toto statement subset, artifacts,
//! and SHA-256 digests.
//!
//! ```
//! use sigcheck_types::{Bundle, BundleExt, BundleVersion};
//!
//! # fn example(json: &str) -> sigcheck_types::Result<()> {
//! let bundle = Bundle::from_json(json)?;
//! if bundle.version()? >= BundleVersion::new(0, 3) {
//!     println!("{} log entries", bundle.tlog_entries().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod bundle;
pub mod encoding;
pub mod error;
pub mod intoto;

pub use artifact::Artifact;

// Re-export protobuf bundle types and extension traits
pub use bundle::{
    pae, Bundle, BundleContent, BundleExt, BundleVersion, DsseEnvelope, DsseEnvelopeExt,
    DsseSignature, HashOutput, HashOutputExt, InclusionPromise, InclusionProof, InclusionProofExt,
    KindVersion, LogId, MediaType, MessageSignature, ProtoCheckpoint, ProtoHashAlgorithm,
    PublicKeyIdentifier, Rfc3161SignedTimestamp, TimestampVerificationData, TransparencyLogEntry,
    TransparencyLogEntryExt, VerificationMaterial, VerificationMaterialContent, X509Certificate,
    X509CertificateChain,
};
pub use encoding::Sha256Hash;
pub use error::{Error, Result};
pub use intoto::{Statement, Subject, INTOTO_PAYLOAD_TYPE};
