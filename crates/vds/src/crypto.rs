//! Domain-separated Merkle tree hashing

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

use crate::Hash32;

const DOMAIN_LEAF: u8 = 0x00;
const DOMAIN_INTERNAL: u8 = 0x01;

/// Number of levels below the root of a map.
pub const MAP_DEPTH: usize = 256;

/// Plain SHA-256 of arbitrary bytes
pub fn sha256(data: &[u8]) -> Hash32 {
    Sha256::digest(data).into()
}

/// leaf = H(0x00 || data)
pub fn leaf_hash(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update([DOMAIN_LEAF]);
    hasher.update(data);
    hasher.finalize().into()
}

/// node = H(0x01 || left || right)
pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut data = [0u8; 1 + 32 + 32];
    data[0] = DOMAIN_INTERNAL;
    data[1..33].copy_from_slice(left);
    data[33..].copy_from_slice(right);
    Sha256::digest(data).into()
}

pub fn is_pow2(n: u64) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Largest power of two strictly less than `n` (1 when `n <= 2`).
pub fn calc_k(n: u64) -> u64 {
    let mut k = 1u64;
    while k << 1 < n {
        k <<= 1;
    }
    k
}

/// Hash of an entirely empty subtree at each map depth.
///
/// Index 256 is the leaf hash of empty bytes, index 0 is the root of an
/// empty map. Computed once and shared.
pub fn default_leaf_values() -> &'static [Hash32; MAP_DEPTH + 1] {
    static DEFAULTS: OnceLock<[Hash32; MAP_DEPTH + 1]> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        let mut defaults = [[0u8; 32]; MAP_DEPTH + 1];
        defaults[MAP_DEPTH] = leaf_hash(&[]);
        for depth in (0..MAP_DEPTH).rev() {
            let child = defaults[depth + 1];
            defaults[depth] = node_hash(&child, &child);
        }
        defaults
    })
}

/// Root hash of a map with no keys set.
pub fn empty_map_root() -> Hash32 {
    default_leaf_values()[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow2_and_k() {
        assert!(!is_pow2(0));
        assert!(is_pow2(1));
        assert!(is_pow2(2));
        assert!(!is_pow2(3));
        assert!(is_pow2(1 << 40));

        assert_eq!(calc_k(2), 1);
        assert_eq!(calc_k(3), 2);
        assert_eq!(calc_k(4), 2);
        assert_eq!(calc_k(5), 4);
        assert_eq!(calc_k(8), 4);
        assert_eq!(calc_k(9), 8);
    }

    #[test]
    fn leaf_and_node_are_domain_separated() {
        let l = leaf_hash(b"x");
        assert_ne!(l, sha256(b"x"));
        assert_ne!(node_hash(&l, &l), leaf_hash(&[l, l].concat()));
    }

    #[test]
    fn default_table_shape() {
        let d = default_leaf_values();
        assert_eq!(d[256], leaf_hash(b""));
        assert_eq!(d[255], node_hash(&d[256], &d[256]));
        assert_eq!(d[0], node_hash(&d[1], &d[1]));
    }
}
