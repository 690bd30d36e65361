use crate::Hash32;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct NodeId {
    /// 0 = root, 256 = leaf
    pub depth: u16,
    /// Key hash with every bit at or below `depth` cleared
    pub prefix: Hash32,
}

impl NodeId {
    pub fn new(key_hash: Hash32, depth: usize) -> Self {
        let mut prefix = key_hash;
        let full_bytes = depth / 8;
        let rem_bits = depth % 8;
        if full_bytes < prefix.len() {
            prefix[full_bytes] &= !(0xFFu8 >> rem_bits);
            for byte in &mut prefix[full_bytes + 1..] {
                *byte = 0;
            }
        }
        Self { depth: depth as u16, prefix }
    }
}

pub trait NodeStore: Send + Sync {
    fn get(&self, id: &NodeId) -> Option<Hash32>;
    fn insert(&mut self, id: NodeId, hash: Hash32);
    fn remove(&mut self, id: &NodeId);
}

/// Only non-default nodes are kept
#[derive(Default, Clone)]
pub struct InMemoryNodeStore {
    nodes: HashMap<NodeId, Hash32>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self { nodes: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn get(&self, id: &NodeId) -> Option<Hash32> {
        self.nodes.get(id).copied()
    }

    fn insert(&mut self, id: NodeId, hash: Hash32) {
        self.nodes.insert(id, hash);
    }

    fn remove(&mut self, id: &NodeId) {
        self.nodes.remove(id);
    }
}
