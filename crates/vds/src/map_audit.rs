//! Rebuild a map from its mutation log and hold its logged heads to it

use tracing::{debug, warn};

use crate::entry::MerkleLeaf;
use crate::log_audit::LogReplay;
use crate::nodestore::InMemoryNodeStore;
use crate::smt::SparseMerkleTree;
use crate::source::LogSource;
use crate::verifier::VerifiableLog;
use crate::{Hash32, LogTreeHead, MapMutation, MapTreeHead, Result, VdsError, VerifiableEntry};

type MutationCallback<'a> = Box<dyn FnMut(u64, &MapMutation) -> Result<()> + 'a>;

pub struct MapAuditor<'a> {
    tree: SparseMerkleTree<InMemoryNodeStore>,
    replay: LogReplay,
    /// Mutation log root after each number of mutations, from the empty log.
    mutation_roots: Vec<Option<Hash32>>,
    /// Map root after each number of mutations, from the empty map.
    map_roots: Vec<Hash32>,
    on_change: Option<MutationCallback<'a>>,
}

impl Default for MapAuditor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> MapAuditor<'a> {
    pub fn new() -> Self {
        let tree = SparseMerkleTree::new(InMemoryNodeStore::new());
        let map_roots = vec![tree.root()];
        Self {
            tree,
            replay: LogReplay::new(),
            mutation_roots: vec![None],
            map_roots,
            on_change: None,
        }
    }

    /// Call `f` with every mutation that changes the map, once the entries
    /// carrying it have been verified.
    pub fn with_callback(mut self, f: impl FnMut(u64, &MapMutation) -> Result<()> + 'a) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    /// Mutations replayed so far.
    pub fn tree_size(&self) -> u64 {
        self.replay.next_index()
    }

    pub fn root(&self) -> Hash32 {
        self.tree.root()
    }

    /// Head of the mutation log as far as it has been replayed.
    pub fn mutation_log_head(&self) -> LogTreeHead {
        self.replay.head()
    }

    /// Apply mutations that the mutation log has already vouched for, then
    /// report the ones that changed the map.
    fn commit(&mut self, verified: Vec<(MapMutation, Hash32)>) -> Result<()> {
        let mut changed = Vec::new();
        for (mutation, leaf) in verified {
            let index = self.tree_size();
            if mutation.apply(&mut self.tree) {
                changed.push((index, mutation));
            }
            self.replay.push(leaf);
            self.mutation_roots.push(self.replay.root());
            self.map_roots.push(self.tree.root());
        }
        if let Some(f) = self.on_change.as_mut() {
            for (index, mutation) in &changed {
                f(*index, mutation)?;
            }
        }
        Ok(())
    }

    /// Check one tree head log entry.
    pub fn check_tree_head_entry<L: LogSource>(
        &mut self,
        mutation_log: &VerifiableLog<L>,
        entry: &VerifiableEntry,
    ) -> Result<()> {
        let head = match entry {
            VerifiableEntry::Json(doc) => MapTreeHead::from_json(doc)?,
            _ => return Err(VdsError::Malformed("tree head log entry is not a JSON document".into())),
        };
        self.check_map_head(mutation_log, &head)
    }

    /// Replay the mutation log up to `head` if needed, then require both
    /// of its roots to match what the replay produced at that size.
    pub fn check_map_head<L: LogSource>(&mut self, mutation_log: &VerifiableLog<L>, head: &MapTreeHead) -> Result<()> {
        let target = &head.mutation_log;
        if target.tree_size > self.tree_size() {
            let prev = self.mutation_log_head();
            let mut verified = Vec::new();
            mutation_log.verify_entries(Some(&prev), target, |_, entry| {
                verified.push((MapMutation::from_entry(entry)?, entry.leaf_hash()?));
                Ok(())
            })?;
            self.commit(verified)?;
        }

        let size = target.tree_size as usize;
        if self.mutation_roots[size] != target.root_hash {
            warn!(tree_size = target.tree_size, "logged mutation log root differs from replay");
            return Err(VdsError::VerificationFailed);
        }
        if self.map_roots[size] != head.root_hash {
            warn!(tree_size = target.tree_size, "logged map root differs from replay");
            return Err(VdsError::VerificationFailed);
        }
        debug!(tree_size = target.tree_size, "map head matches replay");
        Ok(())
    }
}
