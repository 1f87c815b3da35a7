//! Signed entry timestamps
//!
//! A SET is the log's signature over the RFC 8785 canonical JSON of
//! `{body, integratedTime, logID, logIndex}`, promising the entry will be
//! included in the log.

use crate::error::{Error, Result};
use base64::Engine;
use serde::Serialize;
use sigcheck_trust_root::TransparencyLogVerifier;
use sigcheck_types::{TransparencyLogEntry, TransparencyLogEntryExt};

#[derive(Debug, Serialize)]
struct RekorPayload<'a> {
    body: String,
    #[serde(rename = "integratedTime")]
    integrated_time: i64,
    #[serde(rename = "logID")]
    log_id: &'a str,
    #[serde(rename = "logIndex")]
    log_index: i64,
}

/// Canonical bytes the SET signs
pub fn set_payload(
    body: &[u8],
    integrated_time: i64,
    log_id_hex: &str,
    log_index: i64,
) -> Result<Vec<u8>> {
    let payload = RekorPayload {
        body: base64::engine::general_purpose::STANDARD.encode(body),
        integrated_time,
        log_id: log_id_hex,
        log_index,
    };
    serde_json_canonicalizer::to_vec(&payload)
        .map_err(|e| Error::SignedEntryTimestamp(format!("canonicalization failed: {}", e)))
}

/// Verify the entry's inclusion promise with the log's key
pub fn verify_set(entry: &TransparencyLogEntry, verifier: &TransparencyLogVerifier) -> Result<()> {
    let promise = entry
        .inclusion_promise
        .as_ref()
        .ok_or_else(|| {
            Error::SignedEntryTimestamp("entry has no inclusion promise".to_string())
        })?;

    let payload = set_payload(
        &entry.canonicalized_body,
        entry.integrated_time,
        &entry.log_id_hex(),
        entry.log_index,
    )?;

    verifier
        .verify(&payload, &promise.signed_entry_timestamp)
        .map_err(|e| Error::SignedEntryTimestamp(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcheck_trust_root::TrustedRoot;
    use sigcheck_types::{Bundle, BundleExt};

    const TRUSTED_ROOT: &str = include_str!("../../../testdata/trusted_root.json");
    const BUNDLE: &str = include_str!("../../../testdata/bundle_v03.json");

    fn entry() -> TransparencyLogEntry {
        Bundle::from_json(BUNDLE).unwrap().tlog_entries()[0].clone()
    }

    #[test]
    fn test_payload_is_canonical() {
        let payload = set_payload(b"{}", 12, "abcd", 3).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"body":"e30=","integratedTime":12,"logID":"abcd","logIndex":3}"#
        );
    }

    #[test]
    fn test_verify_fixture_set() {
        let root = TrustedRoot::from_json(TRUSTED_ROOT).unwrap();
        let entry = entry();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap();
        verify_set(&entry, verifier).unwrap();
    }

    #[test]
    fn test_any_field_change_breaks_set() {
        let root = TrustedRoot::from_json(TRUSTED_ROOT).unwrap();
        let original = entry();
        let verifier = root.tlog_verifier(&original.log_id_hex()).unwrap();

        let mut e = original.clone();
        e.integrated_time += 1;
        assert!(verify_set(&e, verifier).is_err());

        let mut e = original.clone();
        e.log_index += 1;
        assert!(verify_set(&e, verifier).is_err());

        let mut e = original.clone();
        e.canonicalized_body.push(b' ');
        assert!(verify_set(&e, verifier).is_err());

        let mut e = original;
        e.inclusion_promise = None;
        assert!(verify_set(&e, verifier).is_err());
    }
}
