//! Log inclusion and consistency proof verification

use tracing::{debug, warn};

use crate::crypto::{is_pow2, node_hash};
use crate::{Hash32, LogConsistencyProof, LogInclusionProof, LogTreeHead, Result, VdsError};

/// Check that `proof` reduces its leaf hash to the root of `head`.
pub fn verify_inclusion(proof: &LogInclusionProof, head: &LogTreeHead) -> Result<()> {
    if proof.tree_size != head.tree_size {
        warn!(
            proof_size = proof.tree_size,
            head_size = head.tree_size,
            "inclusion proof is for a different tree size"
        );
        return Err(VdsError::VerificationFailed);
    }
    if proof.leaf_index >= proof.tree_size {
        return Err(VdsError::InvalidRange(format!(
            "leaf index {} outside tree of size {}",
            proof.leaf_index, proof.tree_size
        )));
    }

    let mut fn_ = proof.leaf_index;
    let mut sn = proof.tree_size - 1;
    let mut r = proof.leaf_hash;
    for p in &proof.audit_path {
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

    if sn != 0 || Some(r) != head.root_hash {
        warn!(
            leaf_index = proof.leaf_index,
            tree_size = proof.tree_size,
            "inclusion proof does not reduce to root"
        );
        return Err(VdsError::VerificationFailed);
    }
    debug!(leaf_index = proof.leaf_index, tree_size = proof.tree_size, "inclusion verified");
    Ok(())
}

/// Check that `proof` links the roots of `first` and `second`.
///
/// Requires `0 < first.tree_size < second.tree_size`.
pub fn verify_consistency_proof(
    proof: &LogConsistencyProof,
    first: &LogTreeHead,
    second: &LogTreeHead,
) -> Result<()> {
    if first.tree_size != proof.first_size || second.tree_size != proof.second_size {
        warn!("consistency proof sizes do not match the tree heads");
        return Err(VdsError::VerificationFailed);
    }
    if proof.first_size < 1 || proof.first_size >= proof.second_size {
        return Err(VdsError::InvalidRange(format!(
            "consistency proof needs 0 < {} < {}",
            proof.first_size, proof.second_size
        )));
    }
    let (Some(first_root), Some(second_root)) = (first.root_hash, second.root_hash) else {
        return Err(VdsError::VerificationFailed);
    };

    let mut path: Vec<Hash32> = Vec::with_capacity(proof.audit_path.len() + 1);
    if is_pow2(proof.first_size) {
        path.push(first_root);
    }
    path.extend_from_slice(&proof.audit_path);

    let Some((seed, rest)) = path.split_first() else {
        warn!("empty consistency proof");
        return Err(VdsError::VerificationFailed);
    };

    let mut fn_ = proof.first_size - 1;
    let mut sn = proof.second_size - 1;
    while fn_ & 1 == 1 {
        fn_ >>= 1;
        sn >>= 1;
    }

    let mut fr = *seed;
    let mut sr = *seed;
    for c in rest {
        if sn == 0 {
            warn!("consistency proof is longer than the tree");
            return Err(VdsError::VerificationFailed);
        }
        if fn_ & 1 == 1 || fn_ == sn {
            fr = node_hash(c, &fr);
            sr = node_hash(c, &sr);
            while fn_ & 1 == 0 && fn_ != 0 {
                fn_ >>= 1;
                sn >>= 1;
            }
        } else {
            sr = node_hash(&sr, c);
        }
        fn_ >>= 1;
        sn >>= 1;
    }

    if sn != 0 || fr != first_root || sr != second_root {
        warn!(
            first = proof.first_size,
            second = proof.second_size,
            "consistency proof does not reduce to both roots"
        );
        return Err(VdsError::VerificationFailed);
    }
    debug!(first = proof.first_size, second = proof.second_size, "consistency verified");
    Ok(())
}

/// Check that two heads of the same log agree, in either order.
///
/// Equal sizes are settled by comparing roots; `fetch` is only called with
/// `(smaller, larger)` sizes when a proof is actually needed.
pub fn verify_consistency<F>(a: &LogTreeHead, b: &LogTreeHead, fetch: F) -> Result<()>
where
    F: FnOnce(u64, u64) -> Result<LogConsistencyProof>,
{
    if a.tree_size < 1 || b.tree_size < 1 {
        return Err(VdsError::InvalidRange(format!(
            "consistency needs non-empty trees, got {} and {}",
            a.tree_size, b.tree_size
        )));
    }

    if a.tree_size == b.tree_size {
        if a.root_hash != b.root_hash {
            warn!(tree_size = a.tree_size, "root hash mismatch at equal tree size");
            return Err(VdsError::VerificationFailed);
        }
        return Ok(());
    }

    let (first, second) = if a.tree_size > b.tree_size { (b, a) } else { (a, b) };
    let proof = fetch(first.tree_size, second.tree_size)?;
    verify_consistency_proof(&proof, first, second)
}
