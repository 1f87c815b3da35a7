//! Signed-note checkpoints
//!
//! A checkpoint is a signed tree head in the C2SP signed-note format:
//!
//! ```text
//! <origin>
//! <tree size>
//! <base64 root hash>
//! [other content lines]
//!
//! — <key name> <base64(key hint || signature)>
//! ```
//!
//! The signature covers the note body up to and including the newline that
//! precedes the blank separator line.

use crate::error::{Error, Result};
use base64::Engine;
use sigcheck_trust_root::TransparencyLogVerifier;
use sigcheck_types::Sha256Hash;

const SIGNATURE_PREFIX: &str = "\u{2014} ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSignature {
    pub name: String,
    pub key_hint: [u8; 4],
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub origin: String,
    pub tree_size: u64,
    pub root_hash: Sha256Hash,
    pub other_content: Vec<String>,
    pub signatures: Vec<CheckpointSignature>,
    signed_note: String,
}

impl Checkpoint {
    pub fn from_text(text: &str) -> Result<Self> {
        let split = text
            .find("\n\n")
            .ok_or_else(|| Error::Checkpoint("missing blank line before signatures".to_string()))?;
        let (note, rest) = text.split_at(split + 1);
        let signature_block = &rest[1..];

        let mut lines = note.lines();
        let origin = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::Checkpoint("missing origin".to_string()))?
            .to_string();
        let tree_size = lines
            .next()
            .ok_or_else(|| Error::Checkpoint("missing tree size".to_string()))?
            .parse::<u64>()
            .map_err(|e| Error::Checkpoint(format!("invalid tree size: {}", e)))?;
        let root_b64 = lines
            .next()
            .ok_or_else(|| Error::Checkpoint("missing root hash".to_string()))?;
        let root_bytes = base64::engine::general_purpose::STANDARD
            .decode(root_b64)
            .map_err(|e| Error::Checkpoint(format!("invalid root hash encoding: {}", e)))?;
        let root_hash = Sha256Hash::try_from_slice(&root_bytes)
            .map_err(|e| Error::Checkpoint(format!("invalid root hash: {}", e)))?;
        let other_content = lines.map(str::to_string).collect();

        let mut signatures = Vec::new();
        for line in signature_block.lines().filter(|l| !l.is_empty()) {
            signatures.push(parse_signature_line(line)?);
        }
        if signatures.is_empty() {
            return Err(Error::Checkpoint("no signatures".to_string()));
        }

        Ok(Checkpoint {
            origin,
            tree_size,
            root_hash,
            other_content,
            signatures,
            signed_note: note.to_string(),
        })
    }

    /// The bytes the note signatures cover
    pub fn signed_data(&self) -> &[u8] {
        self.signed_note.as_bytes()
    }

    /// Verify the signature made by `verifier`'s key, selected by key hint
    pub fn verify(&self, verifier: &TransparencyLogVerifier) -> Result<()> {
        let hint = verifier.key_hint();
        let candidates: Vec<_> = self.signatures.iter().filter(|s| s.key_hint == hint).collect();
        if candidates.is_empty() {
            return Err(Error::Checkpoint(format!(
                "no signature from log {}",
                verifier.log_id_hex()
            )));
        }

        for sig in &candidates {
            if verifier.verify(self.signed_data(), &sig.signature).is_ok() {
                tracing::trace!(
                    origin = %self.origin,
                    size = self.tree_size,
                    "checkpoint signature verified"
                );
                return Ok(());
            }
        }
        Err(Error::Checkpoint(format!(
            "signature from log {} does not verify",
            verifier.log_id_hex()
        )))
    }
}

fn parse_signature_line(line: &str) -> Result<CheckpointSignature> {
    let rest = line
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| Error::Checkpoint(format!("malformed signature line: {:?}", line)))?;
    let (name, encoded) = rest
        .rsplit_once(' ')
        .ok_or_else(|| Error::Checkpoint(format!("malformed signature line: {:?}", line)))?;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::Checkpoint(format!("invalid signature encoding: {}", e)))?;
    if raw.len() <= 4 {
        return Err(Error::Checkpoint("signature too short".to_string()));
    }

    let mut key_hint = [0u8; 4];
    key_hint.copy_from_slice(&raw[..4]);
    Ok(CheckpointSignature {
        name: name.to_string(),
        key_hint,
        signature: raw[4..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcheck_trust_root::TrustedRoot;

    const TRUSTED_ROOT: &str = include_str!("../../../testdata/trusted_root.json");
    const LOG_ID: &str = "02504436360a175b0ca0b843871c4451dc7ac4a06041e3aca85b460c6be8aa25";
    const ENVELOPE: &str = concat!(
        "rekor.sigcheck.test - 7463521590116294155\n",
        "8\n",
        "40lX04X/0PM1U7rBMJdWVw3nfwyTXg1VIJfEP7fJUk4=\n",
        "\n",
        "\u{2014} rekor.sigcheck.test ",
        "AlBENjBEAiBOj2RbRPf1qFmvSg0Zwk/46/Tzu4rV3RPUWK38ykjO2gIg",
        "SyocorKoXCliF/y/7EWTZ5grqFi0VG/lyAdYu4l+eYQ=\n",
    );

    #[test]
    fn test_parse_checkpoint() {
        let cp = Checkpoint::from_text(ENVELOPE).unwrap();
        assert_eq!(cp.origin, "rekor.sigcheck.test - 7463521590116294155");
        assert_eq!(cp.tree_size, 8);
        assert!(cp.root_hash.to_hex().starts_with("e34957d3"));
        assert!(cp.other_content.is_empty());
        assert_eq!(cp.signatures.len(), 1);
        assert_eq!(cp.signatures[0].name, "rekor.sigcheck.test");
        assert_eq!(cp.signatures[0].key_hint, [0x02, 0x50, 0x44, 0x36]);
        assert!(cp.signed_data().ends_with(b"=\n"));
        assert!(!cp.signed_data().ends_with(b"\n\n"));
    }

    #[test]
    fn test_verify_checkpoint() {
        let root = TrustedRoot::from_json(TRUSTED_ROOT).unwrap();
        let verifier = root.tlog_verifier(LOG_ID).unwrap();
        Checkpoint::from_text(ENVELOPE).unwrap().verify(verifier).unwrap();
    }

    #[test]
    fn test_tampered_checkpoint_fails() {
        let root = TrustedRoot::from_json(TRUSTED_ROOT).unwrap();
        let verifier = root.tlog_verifier(LOG_ID).unwrap();
        let tampered = ENVELOPE.replacen("\n8\n", "\n9\n", 1);
        let cp = Checkpoint::from_text(&tampered).unwrap();
        assert!(cp.verify(verifier).is_err());
    }

    #[test]
    fn test_malformed_checkpoints() {
        assert!(Checkpoint::from_text("origin\n8\n").is_err());
        assert!(Checkpoint::from_text("origin\nabc\nAAAA\n\n\u{2014} x AAAAAAAA\n").is_err());
        // root hash must be 32 bytes
        assert!(Checkpoint::from_text("origin\n8\nAAAA\n\n\u{2014} x AAAAAAAA\n").is_err());
        let no_sigs = ENVELOPE.split("\n\n").next().unwrap().to_string() + "\n\n";
        assert!(Checkpoint::from_text(&no_sigs).is_err());
        let bad_prefix = ENVELOPE.replace('\u{2014}', "-");
        assert!(Checkpoint::from_text(&bad_prefix).is_err());
    }
}
