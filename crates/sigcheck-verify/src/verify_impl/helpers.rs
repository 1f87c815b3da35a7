//! Helper functions for verification
//!
//! Signing time, certificate path, identity and artifact signature checks,
//! each returning what later steps need.

use crate::error::{Error, Result};
use crate::policy::VerificationPolicy;
use sigcheck_crypto::{build_path, oidc_issuer, subject_alt_names, verify_code_signing_profile};
use sigcheck_crypto::{HashAlgorithm, ParsedCertificate, PublicKey};
use sigcheck_trust_root::TrustedRoot;
use sigcheck_types::{
    Artifact, Bundle, BundleContent, BundleExt, DsseEnvelope, DsseEnvelopeExt, HashOutputExt,
    MessageSignature, Statement, TransparencyLogEntryExt, INTOTO_PAYLOAD_TYPE,
};

/// Decode the bundle's signing certificate
pub fn signing_certificate(bundle: &Bundle) -> Result<ParsedCertificate> {
    let der = bundle.signing_certificate().ok_or_else(|| {
        Error::UnsupportedAlgorithm(
            "public key bundles are not supported, a signing certificate is required".to_string(),
        )
    })?;
    ParsedCertificate::from_der(der)
        .map_err(|e| Error::MalformedInput(format!("signing certificate: {}", e)))
}

/// Which evidence the signing time was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Integrated time of the log entry at this index
    LogEntry(usize),
    /// Claimed genTime of the timestamp at this index
    Timestamp(usize),
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningTime {
    pub time: i64,
    pub source: TimeSource,
}

/// Pick the time the certificate must have been valid at
///
/// In order of preference: the earliest integrated time among entries from
/// known logs, the earliest claimed timestamp, the earliest integrated time
/// of any entry, now. Whatever evidence is chosen must verify in its own
/// step later.
pub fn establish_signing_time(bundle: &Bundle, trusted_root: &TrustedRoot) -> SigningTime {
    let earliest_entry = |known_only: bool| {
        bundle
            .tlog_entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.integrated_time > 0)
            .filter(|(_, entry)| {
                !known_only || trusted_root.tlog_verifier(&entry.log_id_hex()).is_some()
            })
            .min_by_key(|(_, entry)| entry.integrated_time)
            .map(|(i, entry)| SigningTime {
                time: entry.integrated_time,
                source: TimeSource::LogEntry(i),
            })
    };

    let earliest_timestamp = || {
        bundle
            .timestamps()
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let time = sigcheck_tsa::parse_timestamp(&ts.signed_timestamp).ok()?;
                Some((i, time))
            })
            .min_by_key(|(_, t)| *t)
            .map(|(i, time)| SigningTime {
                time,
                source: TimeSource::Timestamp(i),
            })
    };

    earliest_entry(true)
        .or_else(earliest_timestamp)
        .or_else(|| earliest_entry(false))
        .unwrap_or_else(|| SigningTime {
            time: chrono::Utc::now().timestamp(),
            source: TimeSource::Now,
        })
}

/// Build a path from the leaf to a certificate authority valid at `time`
/// and check the leaf's code-signing profile
pub fn verify_certificate_chain(
    leaf: &ParsedCertificate,
    trusted_root: &TrustedRoot,
    time: i64,
) -> Result<Vec<ParsedCertificate>> {
    let anchors = trusted_root.anchors_at(time);
    if anchors.roots.is_empty() {
        return Err(Error::CertificateChain(format!(
            "no certificate authority is valid at {}",
            time
        )));
    }

    let path = build_path(leaf, &anchors.intermediates, &anchors.roots, time)
        .map_err(|e| Error::CertificateChain(e.to_string()))?;
    verify_code_signing_profile(leaf.certificate())
        .map_err(|e| Error::CertificateChain(e.to_string()))?;
    Ok(path)
}

/// Identity read from the signing certificate
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub sans: Vec<String>,
    pub issuer: Option<String>,
}

/// Check the leaf's SAN and OIDC issuer against the policy
pub fn verify_identity(leaf: &ParsedCertificate, policy: &VerificationPolicy) -> Result<Identity> {
    let cert = leaf.certificate();
    let identity = Identity {
        sans: subject_alt_names(cert).map_err(|e| Error::MalformedInput(e.to_string()))?,
        issuer: oidc_issuer(cert).map_err(|e| Error::MalformedInput(e.to_string()))?,
    };

    if let Some(expected) = policy.expected_san() {
        if !identity.sans.iter().any(|san| san == expected) {
            return Err(Error::IdentityMismatch {
                field: "subject alternative name",
                expected: expected.to_string(),
                actual: identity.sans.join(", "),
            });
        }
    }

    if let Some(expected) = policy.expected_issuer() {
        if identity.issuer.as_deref() != Some(expected) {
            return Err(Error::IdentityMismatch {
                field: "issuer",
                expected: expected.to_string(),
                actual: identity.issuer.clone().unwrap_or_default(),
            });
        }
    }

    if let Some(signers) = policy.trusted_signers() {
        if !signers.iter().any(|s| s.matches(&identity.sans, identity.issuer.as_deref())) {
            return Err(Error::IdentityMismatch {
                field: "trusted signer",
                expected: signers
                    .iter()
                    .map(|s| s.san.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                actual: identity.sans.join(", "),
            });
        }
    }

    Ok(identity)
}

/// Verify the bundle's signature with the leaf key
///
/// Returns the message digest a message signature was made over, which log
/// entry bodies must repeat.
pub fn verify_signature(
    bundle: &Bundle,
    leaf: &ParsedCertificate,
    artifact: Option<&Artifact<'_>>,
) -> Result<Option<Vec<u8>>> {
    let key = leaf
        .public_key()
        .map_err(|e| Error::UnsupportedAlgorithm(format!("signing key: {}", e)))?;

    match bundle.signed_content()? {
        BundleContent::MessageSignature(sig) => {
            let digest = message_digest(sig, artifact)?;
            key.verify_prehash(&digest, &sig.signature)
                .map_err(|e| Error::InvalidSignature(e.to_string()))?;
            Ok(Some(digest))
        }
        BundleContent::DsseEnvelope(envelope) => {
            verify_dsse_signature(envelope, &key)?;
            if let Some(artifact) = artifact {
                verify_dsse_subject(envelope, artifact)?;
            }
            Ok(None)
        }
    }
}

fn message_digest(sig: &MessageSignature, artifact: Option<&Artifact<'_>>) -> Result<Vec<u8>> {
    let Some(declared) = &sig.message_digest else {
        let artifact = artifact.ok_or_else(|| {
            Error::MalformedInput(
                "bundle has no message digest and no artifact was supplied".to_string(),
            )
        })?;
        return artifact_digest(artifact, HashAlgorithm::Sha256);
    };

    let hash = HashAlgorithm::from_proto(declared.hash_algorithm())
        .map_err(|e| Error::UnsupportedAlgorithm(e.to_string()))?;
    if declared.digest.len() != hash.output_len() {
        return Err(Error::MalformedInput(format!(
            "{:?} message digest has {} bytes",
            hash,
            declared.digest.len()
        )));
    }
    if let Some(artifact) = artifact {
        if artifact_digest(artifact, hash)? != declared.digest {
            return Err(Error::InvalidSignature(
                "artifact digest does not match the bundle's message digest".to_string(),
            ));
        }
    }
    Ok(declared.digest.clone())
}

fn artifact_digest(artifact: &Artifact<'_>, hash: HashAlgorithm) -> Result<Vec<u8>> {
    match artifact {
        Artifact::Bytes(bytes) => Ok(hash.digest(bytes)),
        Artifact::Digest(digest) if hash == HashAlgorithm::Sha256 => {
            Ok(digest.as_bytes().to_vec())
        }
        Artifact::Digest(_) => Err(Error::UnsupportedAlgorithm(format!(
            "a SHA-256 artifact digest cannot be compared with a {:?} message digest",
            hash
        ))),
    }
}

fn verify_dsse_signature(envelope: &DsseEnvelope, key: &PublicKey) -> Result<()> {
    if envelope.signatures.is_empty() {
        return Err(Error::MalformedInput("DSSE envelope has no signatures".to_string()));
    }
    let pae = envelope.pae();
    if envelope
        .signatures
        .iter()
        .any(|sig| key.verify(&pae, &sig.sig, key.default_hash()).is_ok())
    {
        return Ok(());
    }
    Err(Error::InvalidSignature(
        "no DSSE signature verifies with the signing certificate".to_string(),
    ))
}

fn verify_dsse_subject(envelope: &DsseEnvelope, artifact: &Artifact<'_>) -> Result<()> {
    if envelope.payload_type != INTOTO_PAYLOAD_TYPE {
        return Err(Error::InvalidSignature(format!(
            "cannot bind an artifact to a {} payload",
            envelope.payload_type
        )));
    }
    let statement: Statement = serde_json::from_slice(&envelope.payload)
        .map_err(|e| Error::MalformedInput(format!("in-toto statement: {}", e)))?;
    let digest = hex::encode(artifact_digest(artifact, HashAlgorithm::Sha256)?);
    if !statement.has_sha256_subject(&digest) {
        return Err(Error::InvalidSignature(
            "artifact does not match any subject of the attestation".to_string(),
        ));
    }
    Ok(())
}
