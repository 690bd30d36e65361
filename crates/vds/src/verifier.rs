//! Verifying clients over a log or map source

use tracing::{debug, warn};

use crate::entry::MerkleLeaf;
use crate::map_audit::MapAuditor;
use crate::source::{LogSource, MapSource};
use crate::{
    log_audit, log_proof, map_proof, LogInclusionProof, LogTreeHead, MapTreeState, Result, VdsError,
    VerifiableEntry,
};

/// A log whose answers are checked before they are returned.
pub struct VerifiableLog<L> {
    source: L,
}

impl<L: LogSource> VerifiableLog<L> {
    pub fn new(source: L) -> Self {
        Self { source }
    }

    /// Fetch a proof that `leaf` is in the log at `head` and check it.
    pub fn verify_inclusion<M: MerkleLeaf + ?Sized>(&self, head: &LogTreeHead, leaf: &M) -> Result<()> {
        let leaf_hash = leaf.leaf_hash()?;
        let mut proof = self.source.inclusion_proof(head.tree_size, &leaf_hash)?;
        proof.leaf_hash = leaf_hash;
        log_proof::verify_inclusion(&proof, head)
    }

    pub fn verify_consistency(&self, a: &LogTreeHead, b: &LogTreeHead) -> Result<()> {
        log_proof::verify_consistency(a, b, |first, second| self.source.consistency_proof(first, second))
    }

    /// Head at `tree_size` (0 for latest), proven consistent with `prev`.
    pub fn verified_tree_head(&self, prev: Option<&LogTreeHead>, tree_size: u64) -> Result<LogTreeHead> {
        let prev = prev.filter(|p| p.tree_size > 0);
        if let Some(p) = prev {
            if tree_size != 0 && p.tree_size == tree_size {
                return Ok(p.clone());
            }
        }

        let head = self.source.tree_head(tree_size)?;
        if let Some(p) = prev {
            self.verify_consistency(p, &head)?;
        }
        Ok(head)
    }

    /// Latest head, or `prev` if the log has not grown past it.
    pub fn verified_latest_tree_head(&self, prev: Option<&LogTreeHead>) -> Result<LogTreeHead> {
        let head = self.verified_tree_head(prev, 0)?;
        match prev {
            Some(p) if head.tree_size <= p.tree_size => Ok(p.clone()),
            _ => Ok(head),
        }
    }

    /// Check a proof handed over by someone else, e.g. alongside an entry,
    /// against a head that is consistent with `prev`. Returns that head.
    pub fn verify_supplied_inclusion_proof(
        &self,
        prev: Option<&LogTreeHead>,
        proof: &LogInclusionProof,
    ) -> Result<LogTreeHead> {
        let head = self.verified_tree_head(prev, proof.tree_size)?;
        log_proof::verify_inclusion(proof, &head)?;
        Ok(head)
    }

    /// Fetch every entry added between `prev` and `head` and check that
    /// together they produce `head`.
    pub fn verify_entries<A>(&self, prev: Option<&LogTreeHead>, head: &LogTreeHead, audit: A) -> Result<()>
    where
        A: FnMut(u64, &VerifiableEntry) -> Result<()>,
    {
        let prev = prev.filter(|p| p.tree_size > 0);
        let start = prev.map_or(0, |p| p.tree_size);
        log_audit::verify_entries(
            prev,
            head,
            |tree_size, leaf_index| self.source.inclusion_proof_by_index(tree_size, leaf_index),
            self.source.entries(start, head.tree_size),
            audit,
        )
    }
}

/// Client-held position in a log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LogAnchor {
    #[default]
    Unanchored,
    Anchored(LogTreeHead),
}

impl LogAnchor {
    pub fn head(&self) -> Option<&LogTreeHead> {
        match self {
            Self::Unanchored => None,
            Self::Anchored(head) => Some(head),
        }
    }

    /// Move to the latest head of `log`.
    ///
    /// The first call trusts what it gets. Later calls require a consistency
    /// proof and leave the anchor where it is when the log has not grown. On
    /// error the anchor is unchanged.
    pub fn advance<L: LogSource>(&mut self, log: &VerifiableLog<L>) -> Result<LogTreeHead> {
        let prev = self.head().filter(|h| h.tree_size > 0);
        let next = log.verified_latest_tree_head(prev)?;
        if prev != Some(&next) {
            debug!(tree_size = next.tree_size, "anchor advanced");
        }
        *self = Self::Anchored(next.clone());
        Ok(next)
    }
}

/// A map whose values and heads are checked before they are returned.
pub struct VerifiableMap<M> {
    source: M,
}

impl<M: MapSource> VerifiableMap<M> {
    pub fn new(source: M) -> Self {
        Self { source }
    }

    pub fn mutation_log(&self) -> VerifiableLog<&M::Log> {
        VerifiableLog::new(self.source.mutation_log())
    }

    pub fn tree_head_log(&self) -> VerifiableLog<&M::Log> {
        VerifiableLog::new(self.source.tree_head_log())
    }

    /// Value of `key` in the map at `state`, checked against its root.
    pub fn verified_get(&self, key: &[u8], state: &MapTreeState) -> Result<VerifiableEntry> {
        let entry = self.source.get(key, state.tree_size())?;
        map_proof::verify_map_entry(&entry, &state.map_head)?;
        Ok(entry.value)
    }

    /// Map state at `tree_size` (0 for latest), checked against `prev`:
    /// the mutation log has only been appended to, the tree head log has
    /// only been appended to, and it contains the new map head.
    ///
    /// Returns `None` while the map has no mutations, as there is nothing
    /// in the tree head log to bind it to.
    pub fn verified_map_state(&self, prev: Option<&MapTreeState>, tree_size: u64) -> Result<Option<MapTreeState>> {
        let prev = prev.filter(|p| p.tree_size() > 0);
        if let Some(p) = prev {
            if tree_size != 0 && p.tree_size() == tree_size {
                return Ok(Some(p.clone()));
            }
        }

        let map_head = self.source.tree_head(tree_size)?;
        if map_head.tree_size() == 0 {
            if prev.is_some() {
                warn!("map head went back to empty");
                return Err(VdsError::VerificationFailed);
            }
            return Ok(None);
        }

        let mutation_log = self.mutation_log();
        if let Some(p) = prev {
            mutation_log.verify_consistency(&p.map_head.mutation_log, &map_head.mutation_log)?;
        }

        let tree_head_log = self.tree_head_log();
        let prev_thlth = prev.map(|p| &p.tree_head_log_head);
        let thlth = tree_head_log.verified_latest_tree_head(prev_thlth)?;
        tree_head_log.verify_inclusion(&thlth, &map_head)?;
        debug!(tree_size = map_head.tree_size(), "map state verified");
        Ok(Some(MapTreeState {
            map_head,
            tree_head_log_head: thlth,
        }))
    }

    /// Latest map state, or `prev` if the map has not grown past it.
    pub fn verified_latest_map_state(&self, prev: Option<&MapTreeState>) -> Result<Option<MapTreeState>> {
        let state = self.verified_map_state(prev, 0)?;
        match (prev, state) {
            (Some(p), Some(s)) if s.tree_size() <= p.tree_size() => Ok(Some(p.clone())),
            (Some(p), None) => Ok(Some(p.clone())),
            (_, state) => Ok(state),
        }
    }

    /// Replay the tree head log from `prev` to `head`, rebuilding the map
    /// from its mutation log in `auditor` and checking every logged map head
    /// against the rebuilt roots.
    pub fn verify_map(&self, prev: Option<&MapTreeState>, head: &MapTreeState, auditor: &mut MapAuditor<'_>) -> Result<()> {
        if prev.is_some_and(|p| head.tree_size() <= p.tree_size()) {
            return Ok(());
        }
        let mutation_log = self.mutation_log();
        let prev_thlth = prev.map(|p| &p.tree_head_log_head);
        self.tree_head_log().verify_entries(prev_thlth, &head.tree_head_log_head, |_, entry| {
            auditor.check_tree_head_entry(&mutation_log, entry)
        })?;
        auditor.check_map_head(&mutation_log, &head.map_head)
    }
}
