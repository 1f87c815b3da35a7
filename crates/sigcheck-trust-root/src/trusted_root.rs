//! Validated trusted root
//!
//! [`TrustedRoot`] is built from untrusted bytes in one pass. Any malformed
//! certificate, key, or log declaration rejects the whole document; a
//! partially understood trust root is never returned.

use crate::document::{
    self, ProtoHashAlgorithm, PublicKeyDetails, TimeRangeExt, TransparencyLogInstanceExt,
    TrustedRootDocument, TRUSTED_ROOT_MEDIA_TYPE,
};
use crate::source::TrustRootSource;
use crate::{Error, Result};
use sigcheck_crypto::{HashAlgorithm, ParsedCertificate, PublicKey};
use std::collections::BTreeMap;
use std::path::Path;

/// Embedded trusted root of the Sigstore public production instance
///
/// Snapshot of the `trusted_root.json` target from
/// <https://tuf-repo-cdn.sigstore.dev/>.
pub const SIGSTORE_PRODUCTION_TRUSTED_ROOT: &str = include_str!("trusted_root.json");

/// Closed interval of Unix seconds; a missing bound is open-ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl ValidityPeriod {
    /// Whether `time` falls inside both bounds
    pub fn contains(&self, time: i64) -> bool {
        self.start.map_or(true, |s| time >= s) && self.end.map_or(true, |e| time <= e)
    }

    fn from_range(range: Option<&document::TimeRange>) -> Self {
        match range {
            Some(r) => Self {
                start: r.start_seconds(),
                end: r.end_seconds(),
            },
            None => Self::default(),
        }
    }
}

/// Key types a log may declare in `keyDetails`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDetails {
    PkixEcdsaP256Sha256,
}

impl KeyDetails {
    /// Map a protobuf `PublicKeyDetails` value
    pub fn from_proto(value: i32) -> Result<Self> {
        match PublicKeyDetails::try_from(value) {
            Ok(PublicKeyDetails::PkixEcdsaP256Sha256) => Ok(KeyDetails::PkixEcdsaP256Sha256),
            Ok(other) => Err(Error::UnsupportedAlgorithm(format!(
                "log key type '{}'",
                other.as_str_name()
            ))),
            Err(_) => Err(Error::UnsupportedAlgorithm(format!("log key type {}", value))),
        }
    }
}

/// A log verification key bound to its scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogKey {
    /// Always holds a P-256 key
    EcdsaP256Sha256(PublicKey),
}

impl LogKey {
    fn from_spki_der(details: KeyDetails, der: &[u8]) -> Result<Self> {
        let key = PublicKey::from_spki_der(der)
            .map_err(|e| Error::Malformed(format!("log public key: {}", e)))?;
        match (details, key) {
            (KeyDetails::PkixEcdsaP256Sha256, key @ PublicKey::P256(_)) => {
                Ok(LogKey::EcdsaP256Sha256(key))
            }
            (details, key) => Err(Error::Malformed(format!(
                "log key declared as {:?} is a {:?} key",
                details,
                key.curve()
            ))),
        }
    }

    /// Declared key type
    pub fn details(&self) -> KeyDetails {
        match self {
            LogKey::EcdsaP256Sha256(_) => KeyDetails::PkixEcdsaP256Sha256,
        }
    }

    /// Verify a DER signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> sigcheck_crypto::Result<()> {
        match self {
            LogKey::EcdsaP256Sha256(key) => key.verify(message, signature, HashAlgorithm::Sha256),
        }
    }
}

/// Verifier for one transparency log
#[derive(Debug, Clone)]
pub struct TransparencyLogVerifier {
    log_id: Vec<u8>,
    base_url: String,
    hash_algorithm: HashAlgorithm,
    key: LogKey,
    valid_for: ValidityPeriod,
}

impl TransparencyLogVerifier {
    /// Raw log ID bytes
    pub fn log_id(&self) -> &[u8] {
        &self.log_id
    }

    /// Lowercase hex log ID, the lookup key in [`TrustedRoot`]
    pub fn log_id_hex(&self) -> String {
        hex::encode(&self.log_id)
    }

    /// First four bytes of the log ID, as used by signed-note key hints
    pub fn key_hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        for (dst, src) in hint.iter_mut().zip(self.log_id.iter()) {
            *dst = *src;
        }
        hint
    }

    /// Base URL the log is served from
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Merkle tree hash algorithm
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Verification key for signed entry timestamps and checkpoints
    pub fn key(&self) -> &LogKey {
        &self.key
    }

    /// Period during which the log key may have signed
    pub fn valid_for(&self) -> ValidityPeriod {
        self.valid_for
    }

    /// Verify a DER signature made by the log key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> sigcheck_crypto::Result<()> {
        self.key.verify(message, signature)
    }
}

/// One certificate hierarchy from the trust root
///
/// The declared chain is leaf first and root last. A single-certificate
/// chain is its own leaf and root.
#[derive(Debug, Clone)]
pub struct CaChain {
    pub root: ParsedCertificate,
    pub intermediates: Vec<ParsedCertificate>,
    pub leaf: ParsedCertificate,
    pub uri: String,
    pub subject: Option<String>,
    pub valid_for: ValidityPeriod,
}

impl CaChain {
    fn from_document(ca: &document::CertificateAuthority, what: &str) -> Result<Self> {
        let certs = ca.cert_chain.as_ref().map_or(&[][..], |c| c.certificates.as_slice());
        if certs.is_empty() {
            return Err(Error::Malformed(format!(
                "{} has an empty certificate chain",
                what
            )));
        }

        let mut parsed = Vec::with_capacity(certs.len());
        for (i, cert) in certs.iter().enumerate() {
            let cert = ParsedCertificate::from_der(&cert.raw_bytes)
                .map_err(|e| Error::Malformed(format!("{} certificate {}: {}", what, i, e)))?;
            parsed.push(cert);
        }

        let leaf = parsed[0].clone();
        let root = parsed[parsed.len() - 1].clone();
        let intermediates = if parsed.len() > 2 {
            parsed[1..parsed.len() - 1].to_vec()
        } else {
            Vec::new()
        };

        Ok(CaChain {
            root,
            intermediates,
            leaf,
            uri: ca.uri.clone(),
            subject: ca.subject.as_ref().map(|s| s.common_name.clone()),
            valid_for: ValidityPeriod::from_range(ca.valid_for.as_ref()),
        })
    }

    /// Intermediates and, unless it is also the root, the leaf
    pub fn issuing_pool(&self) -> Vec<ParsedCertificate> {
        let mut pool = self.intermediates.clone();
        if self.leaf != self.root {
            pool.push(self.leaf.clone());
        }
        pool
    }
}

/// A CT log declared by the trust root; decoded but not used for verification
#[derive(Debug, Clone)]
pub struct CtLog {
    pub log_id: Vec<u8>,
    pub base_url: String,
}

/// Roots and allowed intermediates for building a signing-certificate path
#[derive(Debug, Clone, Default)]
pub struct Anchors {
    pub roots: Vec<ParsedCertificate>,
    pub intermediates: Vec<ParsedCertificate>,
}

/// Validated, immutable trust material
#[derive(Debug, Clone)]
pub struct TrustedRoot {
    media_type: String,
    certificate_authorities: Vec<CaChain>,
    timestamp_authorities: Vec<CaChain>,
    tlog_verifiers: BTreeMap<String, TransparencyLogVerifier>,
    ctlogs: Vec<CtLog>,
    roots: Vec<ParsedCertificate>,
    intermediates: Vec<ParsedCertificate>,
}

impl TrustedRoot {
    /// Parse and validate a trusted root from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse and validate a trusted root document
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        // media type is checked before the rest of the document is interpreted
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        match value.get("mediaType").and_then(|m| m.as_str()) {
            Some(TRUSTED_ROOT_MEDIA_TYPE) => {}
            Some(other) => return Err(Error::Schema(other.to_string())),
            None => return Err(Error::Schema("missing mediaType".to_string())),
        }

        let doc: TrustedRootDocument = serde_json::from_value(value)?;
        Self::from_document(&doc)
    }

    /// Parse and validate a trusted root file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    /// Fetch, parse and validate a trusted root from `source`
    pub fn from_source(source: &dyn TrustRootSource) -> Result<Self> {
        Self::from_slice(&source.fetch()?)
    }

    /// The embedded Sigstore production trusted root
    pub fn production() -> Result<Self> {
        Self::from_json(SIGSTORE_PRODUCTION_TRUSTED_ROOT)
    }

    fn from_document(doc: &TrustedRootDocument) -> Result<Self> {
        let mut tlog_verifiers = BTreeMap::new();
        for (i, tlog) in doc.tlogs.iter().enumerate() {
            let verifier = parse_tlog(tlog, i)?;
            let id = verifier.log_id_hex();
            if tlog_verifiers.contains_key(&id) {
                return Err(Error::Malformed(format!(
                    "duplicate transparency log id {}",
                    id
                )));
            }
            tlog_verifiers.insert(id, verifier);
        }

        let certificate_authorities = doc
            .certificate_authorities
            .iter()
            .enumerate()
            .map(|(i, ca)| {
                CaChain::from_document(ca, &format!("certificate authority {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        let timestamp_authorities = doc
            .timestamp_authorities
            .iter()
            .enumerate()
            .map(|(i, ca)| CaChain::from_document(ca, &format!("timestamp authority {}", i)))
            .collect::<Result<Vec<_>>>()?;

        let ctlogs = doc
            .ctlogs
            .iter()
            .map(|ct| CtLog {
                log_id: ct.log_id_bytes().to_vec(),
                base_url: ct.base_url.clone(),
            })
            .collect();

        let roots = certificate_authorities.iter().map(|ca| ca.root.clone()).collect();
        let intermediates = certificate_authorities
            .iter()
            .flat_map(|ca| ca.issuing_pool())
            .collect();

        tracing::debug!(
            tlogs = tlog_verifiers.len(),
            certificate_authorities = certificate_authorities.len(),
            timestamp_authorities = timestamp_authorities.len(),
            "parsed trusted root"
        );

        Ok(TrustedRoot {
            media_type: doc.media_type.clone(),
            certificate_authorities,
            timestamp_authorities,
            tlog_verifiers,
            ctlogs,
            roots,
            intermediates,
        })
    }

    /// Media type the document declared
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Certificate authorities in document order
    pub fn certificate_authorities(&self) -> &[CaChain] {
        &self.certificate_authorities
    }

    /// Timestamp authorities in document order
    pub fn timestamp_authorities(&self) -> &[CaChain] {
        &self.timestamp_authorities
    }

    /// Roots of every certificate authority
    pub fn root_certificates(&self) -> &[ParsedCertificate] {
        &self.roots
    }

    /// Intermediates and leaves of every certificate authority
    pub fn intermediate_pool(&self) -> &[ParsedCertificate] {
        &self.intermediates
    }

    /// Anchors from the certificate authorities whose `validFor` covers `time`
    pub fn anchors_at(&self, time: i64) -> Anchors {
        let mut anchors = Anchors::default();
        let current = self.certificate_authorities.iter().filter(|ca| ca.valid_for.contains(time));
        for ca in current {
            anchors.roots.push(ca.root.clone());
            anchors.intermediates.extend(ca.issuing_pool());
        }
        anchors
    }

    /// Look up a log verifier by hex-encoded log ID
    pub fn tlog_verifier(&self, log_id_hex: &str) -> Option<&TransparencyLogVerifier> {
        self.tlog_verifiers.get(&log_id_hex.to_ascii_lowercase())
    }

    /// Every log verifier, ordered by hex log ID
    pub fn tlog_verifiers(&self) -> impl Iterator<Item = &TransparencyLogVerifier> {
        self.tlog_verifiers.values()
    }

    /// CT logs in document order
    pub fn ct_logs(&self) -> &[CtLog] {
        &self.ctlogs
    }
}

fn parse_tlog(
    tlog: &document::TransparencyLogInstance,
    index: usize,
) -> Result<TransparencyLogVerifier> {
    let hash_algorithm = match ProtoHashAlgorithm::try_from(tlog.hash_algorithm) {
        Ok(ProtoHashAlgorithm::Sha2256) => HashAlgorithm::Sha256,
        other => {
            let name = other.map_or("unknown", |alg| alg.as_str_name());
            return Err(Error::UnsupportedAlgorithm(format!(
                "transparency log {} hash algorithm '{}'",
                index, name
            )));
        }
    };
    if tlog.log_id_bytes().is_empty() {
        return Err(Error::Malformed(format!(
            "transparency log {} has an empty log id",
            index
        )));
    }
    let (Some(public_key), Some(der)) = (tlog.public_key.as_ref(), tlog.public_key_der()) else {
        return Err(Error::Malformed(format!(
            "transparency log {} has no public key",
            index
        )));
    };

    let details = KeyDetails::from_proto(public_key.key_details)?;
    let key = LogKey::from_spki_der(details, der)?;
    debug_assert_eq!(key.details(), details);

    Ok(TransparencyLogVerifier {
        log_id: tlog.log_id_bytes().to_vec(),
        base_url: tlog.base_url.clone(),
        hash_algorithm,
        key,
        valid_for: ValidityPeriod::from_range(public_key.valid_for.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../../testdata/trusted_root.json");
    const LOG_ID: &str = "02504436360a175b0ca0b843871c4451dc7ac4a06041e3aca85b460c6be8aa25";

    fn fixture_value() -> serde_json::Value {
        serde_json::from_str(FIXTURE).unwrap()
    }

    fn parse_value(value: &serde_json::Value) -> Result<TrustedRoot> {
        TrustedRoot::from_slice(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_parse_fixture() {
        let root = TrustedRoot::from_json(FIXTURE).unwrap();
        assert_eq!(root.media_type(), TRUSTED_ROOT_MEDIA_TYPE);
        assert_eq!(root.certificate_authorities().len(), 1);
        assert_eq!(root.timestamp_authorities().len(), 1);
        assert_eq!(root.root_certificates().len(), 1);
        assert_eq!(root.intermediate_pool().len(), 1);
        assert_eq!(root.ct_logs().len(), 1);

        let verifier = root.tlog_verifier(LOG_ID).unwrap();
        assert_eq!(verifier.base_url(), "https://rekor.sigcheck.test");
        assert_eq!(verifier.key_hint(), [0x02, 0x50, 0x44, 0x36]);
        assert_eq!(verifier.key().details(), KeyDetails::PkixEcdsaP256Sha256);
        assert!(root.tlog_verifier(&LOG_ID.to_uppercase()).is_some());
    }

    #[test]
    fn test_wrong_media_type_rejected_first() {
        let mut value = fixture_value();
        value["mediaType"] = "application/vnd.dev.sigstore.trustedroot+json;version=0.2".into();
        assert!(matches!(parse_value(&value), Err(Error::Schema(_))));

        // even when the rest of the document would not decode
        let value = serde_json::json!({"mediaType": "bogus", "tlogs": 7});
        assert!(matches!(parse_value(&value), Err(Error::Schema(_))));

        let value = serde_json::json!({"tlogs": []});
        assert!(matches!(parse_value(&value), Err(Error::Schema(_))));
    }

    #[test]
    fn test_unsupported_hash_algorithm_rejects_document() {
        let mut value = fixture_value();
        value["tlogs"][0]["hashAlgorithm"] = "SHA2_384".into();
        assert!(matches!(parse_value(&value), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_unsupported_key_details_rejects_document() {
        for details in [
            "PKIX_ED25519",
            "PKIX_RSA_PKCS1V15_2048_SHA256",
            "PKIX_ECDSA_P384_SHA_384",
        ] {
            let mut value = fixture_value();
            value["tlogs"][0]["publicKey"]["keyDetails"] = details.into();
            let result = parse_value(&value);
            assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))), "{}", details);
        }

        // absent keyDetails decodes as unspecified
        let mut value = fixture_value();
        value["tlogs"][0]["publicKey"]
            .as_object_mut()
            .unwrap()
            .remove("keyDetails");
        assert!(matches!(parse_value(&value), Err(Error::UnsupportedAlgorithm(_))));

        // names outside the protobuf enum do not decode at all
        let mut value = fixture_value();
        value["tlogs"][0]["publicKey"]["keyDetails"] = "P256".into();
        assert!(parse_value(&value).is_err());
    }

    #[test]
    fn test_key_details_must_match_key() {
        // P-384 CA root key declared as a P-256 log key
        let mut value = fixture_value();
        let root_der = {
            let root = TrustedRoot::from_json(FIXTURE).unwrap();
            let root_cert = root.root_certificates()[0].certificate();
            let spki = &root_cert.tbs_certificate.subject_public_key_info;
            der::Encode::to_der(spki).unwrap()
        };
        value["tlogs"][0]["publicKey"]["rawBytes"] =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, root_der).into();
        assert!(matches!(parse_value(&value), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_duplicate_log_ids_rejected() {
        let mut value = fixture_value();
        let tlog = value["tlogs"][0].clone();
        value["tlogs"].as_array_mut().unwrap().push(tlog);
        let err = parse_value(&value).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_log_id_and_key_rejected() {
        let mut value = fixture_value();
        value["tlogs"][0]["logId"]["keyId"] = "".into();
        assert!(matches!(parse_value(&value), Err(Error::Malformed(_))));

        let mut value = fixture_value();
        value["tlogs"][0]["publicKey"]
            .as_object_mut()
            .unwrap()
            .remove("rawBytes");
        assert!(matches!(parse_value(&value), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_malformed_certificate_rejects_document() {
        let mut value = fixture_value();
        value["timestampAuthorities"][0]["certChain"]["certificates"][1]["rawBytes"] =
            "MIIBAA==".into();
        assert!(matches!(parse_value(&value), Err(Error::Malformed(_))));

        let mut value = fixture_value();
        value["certificateAuthorities"][0]["certChain"]["certificates"] = serde_json::json!([]);
        assert!(matches!(parse_value(&value), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_validity_period() {
        let root = TrustedRoot::from_json(FIXTURE).unwrap();
        let ca = &root.certificate_authorities()[0];
        assert_eq!(ca.valid_for.start, Some(1_609_459_200));
        assert_eq!(ca.valid_for.end, None);
        assert!(ca.valid_for.contains(1_709_294_700));
        assert!(!ca.valid_for.contains(1_609_459_199));

        assert_eq!(root.anchors_at(1_709_294_700).roots.len(), 1);
        assert!(root.anchors_at(1_600_000_000).roots.is_empty());
    }

    #[test]
    fn test_production_root() {
        let root = TrustedRoot::production().unwrap();
        assert_eq!(root.certificate_authorities().len(), 2);
        assert_eq!(root.timestamp_authorities().len(), 1);
        assert_eq!(root.ct_logs().len(), 2);

        let rekor = root
            .tlog_verifier("c0d23d6ad406973f9559f3ba2d1ca01f84147d8ffc5b8445c224f98b9591801d")
            .unwrap();
        assert_eq!(rekor.base_url(), "https://rekor.sigstore.dev");
        assert_eq!(rekor.hash_algorithm(), HashAlgorithm::Sha256);
    }
}
