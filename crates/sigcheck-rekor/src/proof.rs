//! Inclusion proof verification against a signed checkpoint
//!
//! The checkpoint must be signed by the entry's log, agree with the proof on
//! root hash and tree size, and the Merkle path must lead from the entry
//! body's leaf hash to that root.

use crate::checkpoint::Checkpoint;
use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::merkle::{leaf_hash, verify_inclusion};
use sigcheck_trust_root::TransparencyLogVerifier;
use sigcheck_types::{
    InclusionProofExt, Sha256Hash, TransparencyLogEntry, TransparencyLogEntryExt,
};

struct ProofParts<'a> {
    log_index: i64,
    tree_size: i64,
    root_hash: Sha256Hash,
    hashes: Vec<Sha256Hash>,
    checkpoint: &'a str,
}

fn verify_parts(
    body: &[u8],
    parts: ProofParts<'_>,
    verifier: &TransparencyLogVerifier,
) -> Result<Checkpoint> {
    let checkpoint = Checkpoint::from_text(parts.checkpoint)?;
    checkpoint.verify(verifier)?;

    if checkpoint.root_hash != parts.root_hash {
        return Err(Error::InclusionProof(format!(
            "checkpoint root {} does not match proof root {}",
            checkpoint.root_hash, parts.root_hash
        )));
    }

    let index = u64::try_from(parts.log_index).map_err(|_| {
        Error::InclusionProof(format!("negative log index {}", parts.log_index))
    })?;
    let tree_size = u64::try_from(parts.tree_size).map_err(|_| {
        Error::InclusionProof(format!("negative tree size {}", parts.tree_size))
    })?;
    if checkpoint.tree_size != tree_size {
        return Err(Error::InclusionProof(format!(
            "checkpoint tree size {} does not match proof tree size {}",
            checkpoint.tree_size, tree_size
        )));
    }

    verify_inclusion(
        index,
        tree_size,
        &leaf_hash(body),
        &parts.hashes,
        &parts.root_hash,
    )?;
    Ok(checkpoint)
}

/// Verify the inclusion proof carried by a bundle entry
pub fn verify_inclusion_proof(
    entry: &TransparencyLogEntry,
    verifier: &TransparencyLogVerifier,
) -> Result<()> {
    let proof = entry
        .inclusion_proof
        .as_ref()
        .ok_or_else(|| Error::InclusionProof("entry has no inclusion proof".to_string()))?;

    let root_hash = Sha256Hash::try_from_slice(&proof.root_hash)
        .map_err(|e| Error::InclusionProof(format!("root hash: {}", e)))?;
    let hashes = proof
        .hashes
        .iter()
        .map(|h| {
            Sha256Hash::try_from_slice(h)
                .map_err(|e| Error::InclusionProof(format!("proof hash: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;
    let checkpoint_text = proof
        .checkpoint_text()
        .map_err(|e| Error::InclusionProof(e.to_string()))?;

    let checkpoint = verify_parts(
        &entry.canonicalized_body,
        ProofParts {
            log_index: proof.log_index,
            tree_size: proof.tree_size,
            root_hash,
            hashes,
            checkpoint: checkpoint_text,
        },
        verifier,
    )?;
    tracing::trace!(
        origin = %checkpoint.origin,
        size = checkpoint.tree_size,
        "inclusion proof verified"
    );
    Ok(())
}

/// Verify a freshly fetched entry describes the bundle entry and is
/// included in the log's current tree
pub fn verify_fetched_entry(
    entry: &TransparencyLogEntry,
    fetched: &LogEntry,
    verifier: &TransparencyLogVerifier,
) -> Result<()> {
    if fetched.body_bytes()? != entry.canonicalized_body {
        return Err(Error::Mismatch("log returned a different entry body".to_string()));
    }
    if !fetched.log_id.eq_ignore_ascii_case(&entry.log_id_hex()) {
        return Err(Error::Mismatch(format!(
            "log returned an entry from log {}",
            fetched.log_id
        )));
    }
    if entry.integrated_time != 0 && fetched.integrated_time != entry.integrated_time {
        return Err(Error::Mismatch(format!(
            "log reports integrated time {}, bundle claims {}",
            fetched.integrated_time, entry.integrated_time
        )));
    }

    let proof = fetched
        .inclusion_proof()
        .ok_or_else(|| Error::InclusionProof("log returned no inclusion proof".to_string()))?;
    let checkpoint = verify_parts(
        &entry.canonicalized_body,
        ProofParts {
            log_index: proof.log_index,
            tree_size: proof.tree_size,
            root_hash: proof.root()?,
            hashes: proof.path()?,
            checkpoint: &proof.checkpoint,
        },
        verifier,
    )?;
    tracing::debug!(
        uuid = %fetched.uuid,
        size = checkpoint.tree_size,
        "online inclusion proof verified"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogEntryResponse;
    use sigcheck_trust_root::TrustedRoot;
    use sigcheck_types::{Bundle, BundleExt};

    const TRUSTED_ROOT: &str = include_str!("../../../testdata/trusted_root.json");
    const BUNDLE: &str = include_str!("../../../testdata/bundle_v03.json");
    const RESPONSE: &str = include_str!("../../../testdata/rekor_entry_response.json");

    fn setup() -> (TrustedRoot, TransparencyLogEntry) {
        let root = TrustedRoot::from_json(TRUSTED_ROOT).unwrap();
        let entry = Bundle::from_json(BUNDLE).unwrap().tlog_entries()[0].clone();
        (root, entry)
    }

    fn fetched() -> LogEntry {
        let response: LogEntryResponse = serde_json::from_str(RESPONSE).unwrap();
        LogEntry::from_response(response).unwrap()
    }

    #[test]
    fn test_offline_proof() {
        let (root, entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap();
        verify_inclusion_proof(&entry, verifier).unwrap();
    }

    #[test]
    fn test_offline_proof_wrong_body() {
        let (root, mut entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap().clone();
        entry.canonicalized_body = b"{}".to_vec();
        assert!(matches!(
            verify_inclusion_proof(&entry, &verifier),
            Err(Error::InclusionProof(_))
        ));
    }

    #[test]
    fn test_offline_proof_root_must_match_checkpoint() {
        let (root, mut entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap().clone();
        if let Some(proof) = entry.inclusion_proof.as_mut() {
            proof.root_hash = vec![0u8; 32];
        }
        assert!(verify_inclusion_proof(&entry, &verifier).is_err());
    }

    #[test]
    fn test_online_proof() {
        let (root, entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap();
        verify_fetched_entry(&entry, &fetched(), verifier).unwrap();
    }

    #[test]
    fn test_online_body_mismatch() {
        let (root, mut entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap().clone();
        entry.canonicalized_body.push(b'\n');
        assert!(matches!(
            verify_fetched_entry(&entry, &fetched(), &verifier),
            Err(Error::Mismatch(_))
        ));
    }

    #[test]
    fn test_offline_proof_without_checkpoint() {
        let (root, mut entry) = setup();
        let verifier = root.tlog_verifier(&entry.log_id_hex()).unwrap().clone();
        if let Some(proof) = entry.inclusion_proof.as_mut() {
            proof.checkpoint = None;
        }
        assert!(matches!(
            verify_inclusion_proof(&entry, &verifier),
            Err(Error::InclusionProof(_))
        ));
    }
}
