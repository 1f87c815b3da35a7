//! Minimal in-toto statement model
//!
//! Only the subject list is read; it binds a DSSE attestation to artifacts.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Payload type of in-toto statements inside DSSE envelopes
pub const INTOTO_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    #[serde(rename = "_type")]
    pub type_: String,
    #[serde(default)]
    pub subject: Vec<Subject>,
    #[serde(default)]
    pub predicate_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub name: String,
    /// Algorithm name (`sha256`, ...) to hex digest
    #[serde(default)]
    pub digest: BTreeMap<String, String>,
}

impl Statement {
    /// Whether any subject carries this SHA-256 hex digest
    pub fn has_sha256_subject(&self, digest_hex: &str) -> bool {
        self.subject.iter().any(|s| {
            s.digest
                .get("sha256")
                .is_some_and(|d| d.eq_ignore_ascii_case(digest_hex))
        })
    }
}
