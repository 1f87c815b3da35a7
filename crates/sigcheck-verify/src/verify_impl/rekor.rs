//! Rekor entry body consistency
//!
//! Dispatches on the entry's kind. Kinds without a model here are accepted
//! on the strength of their log signature alone.

use crate::error::{Error, Result};
use crate::verify_impl::hashedrekord::{validate_verifier_match, verify_hashedrekord_v001};
use sigcheck_crypto::{sha256, ParsedCertificate};
use sigcheck_rekor::body::DsseV001;
use sigcheck_rekor::EntryBody;
use sigcheck_types::{
    Bundle, BundleContent, BundleExt, DsseEnvelope, TransparencyLogEntry, TransparencyLogEntryExt,
};

pub fn verify_entry_body(
    entry: &TransparencyLogEntry,
    bundle: &Bundle,
    message_digest: Option<&[u8]>,
    leaf: &ParsedCertificate,
) -> Result<()> {
    let (kind, version) = entry
        .kind_and_version()
        .ok_or_else(|| Error::MalformedInput("log entry has no kindVersion".to_string()))?;
    let body = EntryBody::parse(&entry.canonicalized_body, kind, version)?;

    match (&body, bundle.signed_content()?) {
        (EntryBody::HashedRekordV001(body), BundleContent::MessageSignature(sig)) => {
            verify_hashedrekord_v001(body, sig, message_digest, leaf)
        }
        (EntryBody::DsseV001(body), BundleContent::DsseEnvelope(envelope)) => {
            verify_dsse_v001(body, envelope, leaf)
        }
        (EntryBody::Other { kind, api_version }, _) => {
            tracing::debug!(%kind, %api_version, "no body consistency check for entry kind");
            Ok(())
        }
        _ => Err(Error::InvalidLogEntry(format!(
            "{} {} entry does not match the bundle's content",
            kind, version
        ))),
    }
}

/// Payload hash and, when the body lists them, signatures and verifiers
///
/// The envelope hash is not checked: it covers the JSON as submitted, which
/// cannot be reproduced from the bundle.
fn verify_dsse_v001(
    body: &DsseV001,
    envelope: &DsseEnvelope,
    leaf: &ParsedCertificate,
) -> Result<()> {
    let expected = body
        .payload_hash
        .as_ref()
        .ok_or_else(|| Error::InvalidLogEntry("dsse entry has no payload hash".to_string()))?;
    if expected.algorithm != "sha256" {
        return Err(Error::UnsupportedAlgorithm(format!(
            "dsse payload hash algorithm {}",
            expected.algorithm
        )));
    }
    if !expected.value.eq_ignore_ascii_case(&sha256(&envelope.payload).to_hex()) {
        return Err(Error::InvalidLogEntry(
            "dsse payload hash does not match the envelope payload".to_string(),
        ));
    }

    for logged in &body.signatures {
        let signature = logged.signature()?;
        if !envelope.signatures.iter().any(|s| s.sig == signature) {
            return Err(Error::InvalidLogEntry(
                "dsse entry lists a signature the envelope does not carry".to_string(),
            ));
        }
        validate_verifier_match(&logged.verifier()?, leaf)?;
    }
    Ok(())
}
