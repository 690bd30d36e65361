//! Sparse map key paths and inclusion verification

use tracing::{debug, warn};

use crate::crypto::{self, default_leaf_values, node_hash, MAP_DEPTH};
use crate::entry::MerkleLeaf;
use crate::{Hash32, MapEntryResponse, MapTreeHead, Result, VdsError};

/// Bit `i` of `hash`, most significant bit of byte 0 first.
pub(crate) fn path_bit(hash: &Hash32, i: usize) -> bool {
    (hash[i / 8] >> (7 - i % 8)) & 1 == 1
}

/// Position of `key` in the map: `true` means take the right child.
pub fn key_path(key: &[u8]) -> [bool; MAP_DEPTH] {
    let h = crypto::sha256(key);
    let mut path = [false; MAP_DEPTH];
    for (i, bit) in path.iter_mut().enumerate() {
        *bit = path_bit(&h, i);
    }
    path
}

/// Fold a leaf hash up a 256-slot audit path to the root it implies.
pub fn root_from_path(key: &[u8], leaf: Hash32, audit_path: &[Option<Hash32>]) -> Result<Hash32> {
    if audit_path.len() != MAP_DEPTH {
        return Err(VdsError::InvalidRange(format!(
            "map audit path has {} slots, expected {MAP_DEPTH}",
            audit_path.len()
        )));
    }
    let defaults = default_leaf_values();
    let path = key_path(key);

    let mut t = leaf;
    for i in (0..MAP_DEPTH).rev() {
        let sibling = audit_path[i].unwrap_or(defaults[i + 1]);
        t = if path[i] { node_hash(&sibling, &t) } else { node_hash(&t, &sibling) };
    }
    Ok(t)
}

/// Check that the entry's value is what the map held for its key at `head`.
pub fn verify_map_entry(entry: &MapEntryResponse, head: &MapTreeHead) -> Result<()> {
    if entry.tree_size != head.tree_size() {
        warn!(
            entry_size = entry.tree_size,
            head_size = head.tree_size(),
            "map entry is for a different tree size"
        );
        return Err(VdsError::VerificationFailed);
    }

    let leaf = entry.value.leaf_hash()?;
    let root = root_from_path(&entry.key, leaf, &entry.audit_path)?;
    if root != head.root_hash {
        warn!(tree_size = entry.tree_size, "map proof does not reduce to root");
        return Err(VdsError::VerificationFailed);
    }
    debug!(tree_size = entry.tree_size, "map entry verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_is_msb_first() {
        let h = crypto::sha256(b"k");
        let path = key_path(b"k");
        assert_eq!(path[0], h[0] & 0x80 != 0);
        assert_eq!(path[7], h[0] & 0x01 != 0);
        assert_eq!(path[8], h[1] & 0x80 != 0);
        assert_eq!(path[255], h[31] & 0x01 != 0);
    }

    #[test]
    fn wrong_length_path_is_rejected() {
        let err = root_from_path(b"k", [0u8; 32], &[None; 255]).unwrap_err();
        assert!(matches!(err, VdsError::InvalidRange(_)));
    }
}
