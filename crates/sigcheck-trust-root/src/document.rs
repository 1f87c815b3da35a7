//! Wire shape of the trusted root JSON document
//!
//! This module re-exports the official Sigstore protobuf types. Nothing here
//! is trusted: [`crate::TrustedRoot`] is built from a [`TrustedRootDocument`]
//! by the parser, which validates every field.

pub use sigstore_protobuf_specs::dev::sigstore::{
    common::v1::{
        DistinguishedName, HashAlgorithm as ProtoHashAlgorithm, LogId as ProtoLogId,
        PublicKey as ProtoPublicKey, PublicKeyDetails, TimeRange,
    },
    trustroot::v1::{
        CertificateAuthority, TransparencyLogInstance, TrustedRoot as TrustedRootDocument,
    },
};

/// `application/vnd.dev.sigstore.trustedroot+json;version=0.1`
pub const TRUSTED_ROOT_MEDIA_TYPE: &str =
    "application/vnd.dev.sigstore.trustedroot+json;version=0.1";

/// Extension methods for protobuf `TimeRange`
pub trait TimeRangeExt {
    /// Start bound in Unix seconds
    fn start_seconds(&self) -> Option<i64>;

    /// End bound in Unix seconds
    fn end_seconds(&self) -> Option<i64>;
}

impl TimeRangeExt for TimeRange {
    fn start_seconds(&self) -> Option<i64> {
        self.start.as_ref().map(|t| t.seconds)
    }

    fn end_seconds(&self) -> Option<i64> {
        self.end.as_ref().map(|t| t.seconds)
    }
}

/// Extension methods for protobuf `TransparencyLogInstance`
pub trait TransparencyLogInstanceExt {
    /// Raw log ID bytes, empty when absent
    fn log_id_bytes(&self) -> &[u8];

    /// DER SubjectPublicKeyInfo, if declared
    fn public_key_der(&self) -> Option<&[u8]>;
}

impl TransparencyLogInstanceExt for TransparencyLogInstance {
    fn log_id_bytes(&self) -> &[u8] {
        self.log_id.as_ref().map_or(&[], |id| id.key_id.as_slice())
    }

    fn public_key_der(&self) -> Option<&[u8]> {
        self.public_key
            .as_ref()
            .and_then(|k| k.raw_bytes.as_deref())
            .filter(|der| !der.is_empty())
    }
}
