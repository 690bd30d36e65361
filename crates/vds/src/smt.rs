use crate::crypto::{default_leaf_values, node_hash, sha256, MAP_DEPTH};
use crate::map_proof::path_bit;
use crate::nodestore::{NodeId, NodeStore};
use crate::Hash32;

/// 256-level sparse Merkle tree keyed by `SHA-256(key)`.
pub struct SparseMerkleTree<N: NodeStore> {
    root: Hash32,
    store: N,
}

impl<N: NodeStore> SparseMerkleTree<N> {
    pub fn new(store: N) -> Self {
        Self { root: default_leaf_values()[0], store }
    }

    pub fn root(&self) -> Hash32 {
        self.root
    }

    /// Current leaf hash for `key` (the empty leaf if unset).
    pub fn leaf(&self, key: &[u8]) -> Hash32 {
        self.get_node_or_default(&NodeId::new(sha256(key), MAP_DEPTH))
    }

    /// Set the leaf hash for `key`; the empty leaf hash deletes it.
    pub fn update(&mut self, key: &[u8], leaf: Hash32) {
        let key_hash = sha256(key);
        let mut current = leaf;
        self.put(NodeId::new(key_hash, MAP_DEPTH), current);

        for i in (0..MAP_DEPTH).rev() {
            let sibling = self.get_node_or_default(&NodeId::new(flip_bit(key_hash, i), i + 1));
            current = if path_bit(&key_hash, i) {
                node_hash(&sibling, &current)
            } else {
                node_hash(&current, &sibling)
            };
            self.put(NodeId::new(key_hash, i), current);
        }

        self.root = current;
    }

    /// Audit path for `key`, root end first; default siblings are `None`.
    pub fn prove(&self, key: &[u8]) -> Vec<Option<Hash32>> {
        let key_hash = sha256(key);
        (0..MAP_DEPTH)
            .map(|i| self.store.get(&NodeId::new(flip_bit(key_hash, i), i + 1)))
            .collect()
    }

    fn put(&mut self, id: NodeId, hash: Hash32) {
        if hash == default_leaf_values()[id.depth as usize] {
            self.store.remove(&id);
        } else {
            self.store.insert(id, hash);
        }
    }

    fn get_node_or_default(&self, id: &NodeId) -> Hash32 {
        self.store
            .get(id)
            .unwrap_or(default_leaf_values()[id.depth as usize])
    }
}

fn flip_bit(mut key: Hash32, i: usize) -> Hash32 {
    key[i / 8] ^= 0x80 >> (i % 8);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::leaf_hash;
    use crate::map_proof::root_from_path;
    use crate::nodestore::InMemoryNodeStore;

    #[test]
    fn node_id_masks_below_depth() {
        let id = NodeId::new([0xFF; 32], 10);
        assert_eq!(id.prefix[0], 0xFF);
        assert_eq!(id.prefix[1], 0xC0);
        assert!(id.prefix[2..].iter().all(|b| *b == 0));
        assert_eq!(NodeId::new([0xFF; 32], 256).prefix, [0xFF; 32]);
        assert_eq!(NodeId::new([0xFF; 32], 0).prefix, [0; 32]);
    }

    #[test]
    fn delete_restores_empty_root() {
        let mut tree = SparseMerkleTree::new(InMemoryNodeStore::new());
        let empty = tree.root();
        tree.update(b"a", leaf_hash(b"1"));
        assert_ne!(tree.root(), empty);
        // one node per depth along the key's path
        assert_eq!(tree.store.len(), MAP_DEPTH + 1);
        tree.update(b"a", leaf_hash(b""));
        assert_eq!(tree.root(), empty);
        assert!(tree.store.is_empty());
    }

    #[test]
    fn proofs_fold_to_root() {
        let mut tree = SparseMerkleTree::new(InMemoryNodeStore::new());
        tree.update(b"a", leaf_hash(b"1"));
        tree.update(b"b", leaf_hash(b"2"));
        tree.update(b"c", leaf_hash(b"3"));

        for (k, v) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
            let path = tree.prove(k);
            assert_eq!(root_from_path(k, leaf_hash(v), &path).unwrap(), tree.root());
        }
        let absent = tree.prove(b"zzz");
        assert_eq!(root_from_path(b"zzz", leaf_hash(b""), &absent).unwrap(), tree.root());
    }
}
