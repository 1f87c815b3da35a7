//! Rekor v1 API log entry types

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sigcheck_types::Sha256Hash;
use std::collections::HashMap;

/// A log entry as returned by `GET /api/v1/log/entries`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// UUID of the entry (the key in the response map)
    #[serde(skip)]
    pub uuid: String,
    /// Base64 canonicalized body
    pub body: String,
    pub integrated_time: i64,
    /// Hex SHA-256 of the log's public key
    #[serde(rename = "logID")]
    pub log_id: String,
    pub log_index: i64,
    #[serde(default)]
    pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    #[serde(default)]
    pub inclusion_proof: Option<InclusionProof>,
    /// Base64 SET
    #[serde(default)]
    pub signed_entry_timestamp: Option<String>,
}

/// Inclusion proof in the v1 API, with hex hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Signed-note checkpoint text
    pub checkpoint: String,
    pub hashes: Vec<String>,
    pub log_index: i64,
    pub root_hash: String,
    pub tree_size: i64,
}

/// Response body: a map of UUID to entry
pub type LogEntryResponse = HashMap<String, LogEntry>;

impl LogEntry {
    /// Take the single entry out of a lookup response
    pub fn from_response(response: LogEntryResponse) -> Result<Self> {
        let mut entries = response.into_iter();
        let (uuid, mut entry) = entries
            .next()
            .ok_or_else(|| Error::Response("log returned no entries".to_string()))?;
        if entries.next().is_some() {
            return Err(Error::Response(
                "log returned more than one entry".to_string(),
            ));
        }
        entry.uuid = uuid;
        Ok(entry)
    }

    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.body)
            .map_err(|e| Error::Body(format!("invalid body encoding: {}", e)))
    }

    pub fn inclusion_proof(&self) -> Option<&InclusionProof> {
        self.verification.as_ref().and_then(|v| v.inclusion_proof.as_ref())
    }
}

impl InclusionProof {
    pub fn root(&self) -> Result<Sha256Hash> {
        Sha256Hash::from_hex(&self.root_hash)
            .map_err(|e| Error::InclusionProof(format!("root hash: {}", e)))
    }

    pub fn path(&self) -> Result<Vec<Sha256Hash>> {
        self.hashes
            .iter()
            .map(|h| {
                Sha256Hash::from_hex(h)
                    .map_err(|e| Error::InclusionProof(format!("proof hash: {}", e)))
            })
            .collect()
    }
}
