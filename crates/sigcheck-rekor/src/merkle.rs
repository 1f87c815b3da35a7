//! RFC 6962 Merkle tree hashing and inclusion proofs
//!
//! Proof verification follows the algorithm of RFC 9162 section 2.1.3.2.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use sigcheck_types::Sha256Hash;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash of a leaf: `SHA-256(0x00 || data)`
pub fn leaf_hash(data: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    Sha256Hash::from_bytes(hasher.finalize().into())
}

/// Hash of an interior node: `SHA-256(0x01 || left || right)`
pub fn node_hash(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Sha256Hash::from_bytes(hasher.finalize().into())
}

/// Compute the root implied by an inclusion proof
pub fn root_from_inclusion_proof(
    index: u64,
    tree_size: u64,
    leaf: &Sha256Hash,
    proof: &[Sha256Hash],
) -> Result<Sha256Hash> {
    if index >= tree_size {
        return Err(Error::InclusionProof(format!(
            "leaf index {} is outside a tree of size {}",
            index, tree_size
        )));
    }

    let mut fn_ = index;
    let mut sn = tree_size - 1;
    let mut r = *leaf;

    for p in proof {
        if sn == 0 {
            return Err(Error::InclusionProof("proof has too many hashes".to_string()));
        }
        if fn_ & 1 == 1 || fn_ == sn {
            r = node_hash(p, &r);
            while fn_ & 1 == 0 && fn_ != 0 {
                fn_ >>= 1;
                sn >>= 1;
            }
        } else {
            r = node_hash(&r, p);
        }
        fn_ >>= 1;
        sn >>= 1;
    }

    if sn != 0 {
        return Err(Error::InclusionProof("proof has too few hashes".to_string()));
    }
    Ok(r)
}

/// Verify that `leaf` is at `index` in the tree of `tree_size` with `root`
pub fn verify_inclusion(
    index: u64,
    tree_size: u64,
    leaf: &Sha256Hash,
    proof: &[Sha256Hash],
    root: &Sha256Hash,
) -> Result<()> {
    let computed = root_from_inclusion_proof(index, tree_size, leaf, proof)?;
    if computed != *root {
        return Err(Error::InclusionProof(format!(
            "computed root {} does not match expected root {}",
            computed, root
        )));
    }
    Ok(())
}
