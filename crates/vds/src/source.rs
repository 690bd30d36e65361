//! Where verifiers get heads, proofs and entries from

use crate::{
    Hash32, LogConsistencyProof, LogInclusionProof, LogTreeHead, MapEntryResponse, MapTreeHead, Result,
    VerifiableEntry,
};

/// Entries with their log indices, in the order the server returned them.
pub type EntryStream<'a> = Box<dyn Iterator<Item = Result<(u64, VerifiableEntry)>> + 'a>;

pub trait LogSource {
    /// Head at `tree_size`; 0 asks for the latest.
    fn tree_head(&self, tree_size: u64) -> Result<LogTreeHead>;

    /// Proof for the first leaf with `leaf_hash` in the tree of `tree_size`.
    fn inclusion_proof(&self, tree_size: u64, leaf_hash: &Hash32) -> Result<LogInclusionProof>;

    fn inclusion_proof_by_index(&self, tree_size: u64, leaf_index: u64) -> Result<LogInclusionProof>;

    fn consistency_proof(&self, first_size: u64, second_size: u64) -> Result<LogConsistencyProof>;

    /// Entries `[start, end)`. The stream may stop early.
    fn entries(&self, start: u64, end: u64) -> EntryStream<'_>;
}

impl<T: LogSource + ?Sized> LogSource for &T {
    fn tree_head(&self, tree_size: u64) -> Result<LogTreeHead> {
        (**self).tree_head(tree_size)
    }

    fn inclusion_proof(&self, tree_size: u64, leaf_hash: &Hash32) -> Result<LogInclusionProof> {
        (**self).inclusion_proof(tree_size, leaf_hash)
    }

    fn inclusion_proof_by_index(&self, tree_size: u64, leaf_index: u64) -> Result<LogInclusionProof> {
        (**self).inclusion_proof_by_index(tree_size, leaf_index)
    }

    fn consistency_proof(&self, first_size: u64, second_size: u64) -> Result<LogConsistencyProof> {
        (**self).consistency_proof(first_size, second_size)
    }

    fn entries(&self, start: u64, end: u64) -> EntryStream<'_> {
        (**self).entries(start, end)
    }
}

pub trait MapSource {
    type Log: LogSource;

    /// Map head after `tree_size` mutations; 0 asks for the latest.
    fn tree_head(&self, tree_size: u64) -> Result<MapTreeHead>;

    /// Value for `key` with its audit path in the map of `tree_size`.
    fn get(&self, key: &[u8], tree_size: u64) -> Result<MapEntryResponse>;

    fn mutation_log(&self) -> &Self::Log;

    fn tree_head_log(&self) -> &Self::Log;
}

impl<T: MapSource + ?Sized> MapSource for &T {
    type Log = T::Log;

    fn tree_head(&self, tree_size: u64) -> Result<MapTreeHead> {
        (**self).tree_head(tree_size)
    }

    fn get(&self, key: &[u8], tree_size: u64) -> Result<MapEntryResponse> {
        (**self).get(key, tree_size)
    }

    fn mutation_log(&self) -> &Self::Log {
        (**self).mutation_log()
    }

    fn tree_head_log(&self) -> &Self::Log {
        (**self).tree_head_log()
    }
}
