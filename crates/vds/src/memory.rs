//! In-memory log and map servers that hand out proofs

use std::collections::HashMap;

use tracing::debug;

use crate::entry::MerkleLeaf;
use crate::nodestore::InMemoryNodeStore;
use crate::ranges::{consistency_ranges, inclusion_ranges, subtree_hash};
use crate::smt::SparseMerkleTree;
use crate::source::{EntryStream, LogSource, MapSource};
use crate::{
    Hash32, LogConsistencyProof, LogInclusionProof, LogTreeHead, MapEntryResponse, MapMutation, MapTreeHead, Result,
    VdsError, VerifiableEntry,
};

/// Append-only log holding its entries in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLog {
    entries: Vec<VerifiableEntry>,
    leaves: Vec<Hash32>,
    first_index: HashMap<Hash32, u64>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, returning its leaf index.
    pub fn append(&mut self, entry: VerifiableEntry) -> Result<u64> {
        let leaf = entry.leaf_hash()?;
        let index = self.leaves.len() as u64;
        self.first_index.entry(leaf).or_insert(index);
        self.leaves.push(leaf);
        self.entries.push(entry);
        debug!(index, "entry appended");
        Ok(index)
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn head(&self) -> LogTreeHead {
        self.head_at(self.len())
    }

    /// Overwrite a stored entry without touching the hashes already served.
    /// Lets tests play a server that returns something other than what it logged.
    pub fn tamper_entry(&mut self, index: u64, entry: VerifiableEntry) -> Result<()> {
        let slot = self.entries.get_mut(index as usize).ok_or(VdsError::NotFound)?;
        *slot = entry;
        Ok(())
    }

    fn head_at(&self, tree_size: u64) -> LogTreeHead {
        let root_hash = (tree_size > 0).then(|| subtree_hash(&self.leaves, 0, tree_size));
        LogTreeHead { tree_size, root_hash }
    }

    fn check_size(&self, tree_size: u64) -> Result<()> {
        if tree_size > self.len() {
            return Err(VdsError::NotFound);
        }
        Ok(())
    }
}

impl LogSource for InMemoryLog {
    fn tree_head(&self, tree_size: u64) -> Result<LogTreeHead> {
        if tree_size == 0 {
            return Ok(self.head());
        }
        self.check_size(tree_size)?;
        Ok(self.head_at(tree_size))
    }

    fn inclusion_proof(&self, tree_size: u64, leaf_hash: &Hash32) -> Result<LogInclusionProof> {
        match self.first_index.get(leaf_hash) {
            Some(&index) if index < tree_size => self.inclusion_proof_by_index(tree_size, index),
            _ => Err(VdsError::NotFound),
        }
    }

    fn inclusion_proof_by_index(&self, tree_size: u64, leaf_index: u64) -> Result<LogInclusionProof> {
        self.check_size(tree_size)?;
        if leaf_index >= tree_size {
            return Err(VdsError::InvalidRange(format!(
                "leaf index {leaf_index} outside tree of size {tree_size}"
            )));
        }
        let audit_path = inclusion_ranges(leaf_index, 0, tree_size)
            .into_iter()
            .map(|(start, end)| subtree_hash(&self.leaves, start, end))
            .collect();
        Ok(LogInclusionProof {
            leaf_hash: self.leaves[leaf_index as usize],
            tree_size,
            leaf_index,
            audit_path,
        })
    }

    fn consistency_proof(&self, first_size: u64, second_size: u64) -> Result<LogConsistencyProof> {
        self.check_size(second_size)?;
        if first_size < 1 || first_size > second_size {
            return Err(VdsError::InvalidRange(format!(
                "no consistency proof from {first_size} to {second_size}"
            )));
        }
        let audit_path = consistency_ranges(first_size, 0, second_size, true)
            .into_iter()
            .map(|(start, end)| subtree_hash(&self.leaves, start, end))
            .collect();
        Ok(LogConsistencyProof { first_size, second_size, audit_path })
    }

    fn entries(&self, start: u64, end: u64) -> EntryStream<'_> {
        let end = end.min(self.len());
        let start = start.min(end);
        Box::new(
            (start..end)
                .zip(self.entries[start as usize..end as usize].iter())
                .map(|(index, entry)| Ok::<_, VdsError>((index, entry.clone()))),
        )
    }
}

/// Sparse Merkle map driven by its own mutation log, with every resulting
/// map head appended to a tree head log.
pub struct InMemoryMap {
    mutation_log: InMemoryLog,
    tree_head_log: InMemoryLog,
    tree: SparseMerkleTree<InMemoryNodeStore>,
    mutations: Vec<MapMutation>,
    /// Map root after each number of mutations, starting from the empty map.
    roots: Vec<Hash32>,
    /// Value history per key as `(tree_size, value)`.
    values: HashMap<Vec<u8>, Vec<(u64, VerifiableEntry)>>,
}

impl Default for InMemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMap {
    pub fn new() -> Self {
        let tree = SparseMerkleTree::new(InMemoryNodeStore::new());
        let roots = vec![tree.root()];
        Self {
            mutation_log: InMemoryLog::new(),
            tree_head_log: InMemoryLog::new(),
            tree,
            mutations: Vec::new(),
            roots,
            values: HashMap::new(),
        }
    }

    pub fn tree_size(&self) -> u64 {
        self.mutations.len() as u64
    }

    pub fn set(&mut self, key: &[u8], value: VerifiableEntry) -> Result<MapTreeHead> {
        let mutation = MapMutation::Set {
            key: key.to_vec(),
            value_leaf_input: value.leaf_input()?,
        };
        self.mutate(mutation, value)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<MapTreeHead> {
        self.mutate(MapMutation::Delete { key: key.to_vec() }, VerifiableEntry::RawData(Vec::new()))
    }

    /// Set `key` to `value` only if its current leaf hash is `previous`.
    pub fn update(&mut self, key: &[u8], value: VerifiableEntry, previous: Hash32) -> Result<MapTreeHead> {
        let mutation = MapMutation::Update {
            key: key.to_vec(),
            value_leaf_input: value.leaf_input()?,
            previous,
        };
        self.mutate(mutation, value)
    }

    fn mutate(&mut self, mutation: MapMutation, value: VerifiableEntry) -> Result<MapTreeHead> {
        self.mutation_log.append(mutation.to_entry()?)?;
        let tree_size = self.mutation_log.len();

        if mutation.apply(&mut self.tree) {
            self.values
                .entry(mutation.key().to_vec())
                .or_default()
                .push((tree_size, value));
        }
        self.mutations.push(mutation);
        self.roots.push(self.tree.root());

        let head = MapTreeHead {
            mutation_log: self.mutation_log.head(),
            root_hash: self.tree.root(),
        };
        self.tree_head_log.append(VerifiableEntry::Json(head.to_json()))?;
        debug!(tree_size, "map mutation applied");
        Ok(head)
    }

    fn value_at(&self, key: &[u8], tree_size: u64) -> VerifiableEntry {
        self.values
            .get(key)
            .and_then(|history| history.iter().rev().find(|(size, _)| *size <= tree_size))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| VerifiableEntry::RawData(Vec::new()))
    }

    fn audit_path_at(&self, key: &[u8], tree_size: u64) -> Vec<Option<Hash32>> {
        if tree_size == self.tree_size() {
            return self.tree.prove(key);
        }
        let mut tree = SparseMerkleTree::new(InMemoryNodeStore::new());
        for mutation in &self.mutations[..tree_size as usize] {
            mutation.apply(&mut tree);
        }
        tree.prove(key)
    }

    /// Leaf hash currently stored for `key`, as an `update` caller needs it.
    pub fn leaf(&self, key: &[u8]) -> Hash32 {
        self.tree.leaf(key)
    }

    fn resolve_size(&self, tree_size: u64) -> Result<u64> {
        match tree_size {
            0 => Ok(self.tree_size()),
            n if n > self.tree_size() => Err(VdsError::NotFound),
            n => Ok(n),
        }
    }
}

impl MapSource for InMemoryMap {
    type Log = InMemoryLog;

    fn tree_head(&self, tree_size: u64) -> Result<MapTreeHead> {
        let tree_size = self.resolve_size(tree_size)?;
        Ok(MapTreeHead {
            mutation_log: self.mutation_log.head_at(tree_size),
            root_hash: self.roots[tree_size as usize],
        })
    }

    fn get(&self, key: &[u8], tree_size: u64) -> Result<MapEntryResponse> {
        let tree_size = self.resolve_size(tree_size)?;
        let value = self.value_at(key, tree_size);
        Ok(MapEntryResponse {
            key: key.to_vec(),
            value,
            tree_size,
            audit_path: self.audit_path_at(key, tree_size),
        })
    }

    fn mutation_log(&self) -> &InMemoryLog {
        &self.mutation_log
    }

    fn tree_head_log(&self) -> &InMemoryLog {
        &self.tree_head_log
    }
}
