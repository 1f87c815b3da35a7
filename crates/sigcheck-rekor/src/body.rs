//! Canonicalized log entry bodies
//!
//! Only the entry kinds whose contents are cross-checked against the bundle
//! are modelled; any other kind is kept as [`EntryBody::Other`].

use crate::error::{Error, Result};
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    HashedRekordV001(HashedRekordV001),
    DsseV001(DsseV001),
    Other { kind: String, api_version: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    api_version: String,
    kind: String,
    #[serde(default)]
    spec: serde_json::Value,
}

impl EntryBody {
    /// Decode a body, checking it declares the `kind` and `version` the
    /// bundle entry claims
    pub fn parse(body: &[u8], kind: &str, version: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| Error::Body(format!("not a log entry body: {}", e)))?;
        if envelope.kind != kind || envelope.api_version != version {
            return Err(Error::Body(format!(
                "body is {} {}, entry claims {} {}",
                envelope.kind, envelope.api_version, kind, version
            )));
        }

        match (kind, version) {
            ("hashedrekord", "0.0.1") => serde_json::from_value(envelope.spec)
                .map(EntryBody::HashedRekordV001)
                .map_err(|e| Error::Body(format!("hashedrekord spec: {}", e))),
            ("dsse", "0.0.1") => serde_json::from_value(envelope.spec)
                .map(EntryBody::DsseV001)
                .map_err(|e| Error::Body(format!("dsse spec: {}", e))),
            _ => Ok(EntryBody::Other {
                kind: envelope.kind,
                api_version: envelope.api_version,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HashedRekordV001 {
    pub data: HashedRekordData,
    pub signature: HashedRekordSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HashedRekordData {
    pub hash: HexHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HexHash {
    /// Lowercase algorithm name, e.g. `sha256`
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedRekordSignature {
    /// Base64 signature
    pub content: String,
    pub public_key: HashedRekordPublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HashedRekordPublicKey {
    /// Base64 of a PEM certificate or public key
    pub content: String,
}

/// Signer material embedded in a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verifier {
    /// DER certificate
    Certificate(Vec<u8>),
    /// DER SubjectPublicKeyInfo
    PublicKey(Vec<u8>),
}

impl HashedRekordV001 {
    pub fn digest(&self) -> Result<Vec<u8>> {
        hex::decode(&self.data.hash.value)
            .map_err(|e| Error::Body(format!("invalid digest hex: {}", e)))
    }

    pub fn signature(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.signature.content)
            .map_err(|e| Error::Body(format!("invalid signature encoding: {}", e)))
    }

    pub fn verifier(&self) -> Result<Verifier> {
        decode_pem_verifier(&self.signature.public_key.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsseV001 {
    #[serde(default)]
    pub payload_hash: Option<HexHash>,
    #[serde(default)]
    pub envelope_hash: Option<HexHash>,
    #[serde(default)]
    pub signatures: Vec<DsseBodySignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DsseBodySignature {
    /// Base64 signature
    pub signature: String,
    /// Base64 of a PEM certificate or public key
    pub verifier: String,
}

impl DsseBodySignature {
    pub fn signature(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.signature)
            .map_err(|e| Error::Body(format!("invalid signature encoding: {}", e)))
    }

    pub fn verifier(&self) -> Result<Verifier> {
        decode_pem_verifier(&self.verifier)
    }
}

fn decode_pem_verifier(b64_pem: &str) -> Result<Verifier> {
    let pem = base64::engine::general_purpose::STANDARD
        .decode(b64_pem)
        .map_err(|e| Error::Body(format!("invalid verifier encoding: {}", e)))?;
    let (label, der) = x509_cert::der::pem::decode_vec(&pem)
        .map_err(|e| Error::Body(format!("invalid verifier PEM: {}", e)))?;
    match label {
        "CERTIFICATE" => Ok(Verifier::Certificate(der)),
        "PUBLIC KEY" => Ok(Verifier::PublicKey(der)),
        other => Err(Error::Body(format!("unexpected PEM label {}", other))),
    }
}
