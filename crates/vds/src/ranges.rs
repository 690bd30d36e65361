//! Subtree ranges making up log audit paths.
//!
//! Each range `(start, end)` is a half-open span of leaf indices whose
//! subtree hash is one element of an audit path. Ranges are returned in the
//! order the verifier consumes them: leaf end first, root end last.

use crate::crypto::{calc_k, leaf_hash, node_hash};
use crate::Hash32;

pub type LeafRange = (u64, u64);

/// Ranges for the inclusion audit path of leaf `m` within `[start, end)`.
pub fn inclusion_ranges(m: u64, start: u64, end: u64) -> Vec<LeafRange> {
    let mut ranges = Vec::new();
    push_inclusion(m, start, end, &mut ranges);
    ranges
}

fn push_inclusion(m: u64, start: u64, end: u64, out: &mut Vec<LeafRange>) {
    let n = end - start;
    if n <= 1 {
        return;
    }
    let k = calc_k(n);
    if m < k {
        push_inclusion(m, start, start + k, out);
        out.push((start + k, end));
    } else {
        push_inclusion(m - k, start + k, end, out);
        out.push((start, start + k));
    }
}

/// Ranges for a consistency audit path from the first `m` leaves of
/// `[start, end)` to the whole span.
///
/// `whole_subtree` is true while the boundary subtree is still known to the
/// verifier as the old root; once descended on the right it must be emitted.
pub fn consistency_ranges(m: u64, start: u64, end: u64, whole_subtree: bool) -> Vec<LeafRange> {
    let mut ranges = Vec::new();
    push_consistency(m, start, end, whole_subtree, &mut ranges);
    ranges
}

fn push_consistency(m: u64, start: u64, end: u64, whole_subtree: bool, out: &mut Vec<LeafRange>) {
    let n = end - start;
    if m == n {
        if !whole_subtree {
            out.push((start, end));
        }
        return;
    }
    let k = calc_k(n);
    if m <= k {
        push_consistency(m, start, start + k, whole_subtree, out);
        out.push((start + k, end));
    } else {
        push_consistency(m - k, start + k, end, false, out);
        out.push((start, start + k));
    }
}

/// Merkle tree hash over a span of already leaf-hashed entries.
pub fn subtree_hash(leaves: &[Hash32], start: u64, end: u64) -> Hash32 {
    let n = end - start;
    if n == 0 {
        return crate::crypto::sha256(&[]);
    }
    if n == 1 {
        return leaves[start as usize];
    }
    let k = calc_k(n);
    let left = subtree_hash(leaves, start, start + k);
    let right = subtree_hash(leaves, start + k, end);
    node_hash(&left, &right)
}

/// Convenience for fixtures: Merkle root over raw leaf inputs.
pub fn root_of<T: AsRef<[u8]>>(inputs: &[T]) -> Option<Hash32> {
    if inputs.is_empty() {
        return None;
    }
    let leaves: Vec<Hash32> = inputs.iter().map(|i| leaf_hash(i.as_ref())).collect();
    Some(subtree_hash(&leaves, 0, leaves.len() as u64))
}
