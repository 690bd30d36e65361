//! Streaming replay of log entries into a root hash

use tracing::{debug, warn};

use crate::crypto::node_hash;
use crate::entry::{MerkleLeaf, VerifiableEntry};
use crate::{Hash32, LogInclusionProof, LogTreeHead, Result, VdsError};

/// Stack of completed subtree hashes, largest (leftmost) first.
///
/// After `n` leaves the stack holds one hash per set bit of `n`.
#[derive(Clone, Debug, Default)]
pub struct LogReplay {
    stack: Vec<Hash32>,
    next_index: u64,
}

impl LogReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after `prev` using the inclusion proof of leaf `prev.tree_size`
    /// in a tree of size `prev.tree_size + 1`. Every element of that path is a
    /// left sibling, so folding it must give back `prev`'s root.
    pub fn resume(prev: &LogTreeHead, proof: &LogInclusionProof) -> Result<Self> {
        if proof.leaf_index != prev.tree_size || proof.tree_size != prev.tree_size + 1 {
            return Err(VdsError::VerificationFailed);
        }
        // one completed subtree per set bit of the previous size
        if proof.audit_path.len() != prev.tree_size.count_ones() as usize {
            warn!(
                tree_size = prev.tree_size,
                path_len = proof.audit_path.len(),
                "resume path has the wrong shape"
            );
            return Err(VdsError::VerificationFailed);
        }

        let mut folded: Option<Hash32> = None;
        for p in &proof.audit_path {
            folded = Some(match folded {
                None => *p,
                Some(acc) => node_hash(p, &acc),
            });
        }
        if folded.is_none() || folded != prev.root_hash {
            warn!(tree_size = prev.tree_size, "resume path does not reproduce previous root");
            return Err(VdsError::VerificationFailed);
        }

        Ok(Self {
            stack: proof.audit_path.iter().rev().copied().collect(),
            next_index: prev.tree_size,
        })
    }

    /// Index the next pushed leaf will take.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn push(&mut self, leaf: Hash32) {
        self.stack.push(leaf);
        let mut z = self.next_index;
        while z & 1 == 1 {
            // two completed siblings always sit on top here
            let right = self.stack.pop().unwrap_or_default();
            let left = self.stack.pop().unwrap_or_default();
            self.stack.push(node_hash(&left, &right));
            z >>= 1;
        }
        self.next_index += 1;
    }

    /// Root over everything pushed so far; `None` for an empty log.
    pub fn root(&self) -> Option<Hash32> {
        let (last, rest) = self.stack.split_last()?;
        Some(rest.iter().rev().fold(*last, |acc, left| node_hash(left, &acc)))
    }

    pub fn head(&self) -> LogTreeHead {
        LogTreeHead { tree_size: self.next_index, root_hash: self.root() }
    }
}

/// Replay entries `[prev.tree_size, head.tree_size)` and check they produce
/// `head`'s root.
///
/// `fetch_seed(tree_size, leaf_index)` supplies the resume proof when `prev`
/// is non-empty. `audit` sees every entry, in order, before it is hashed.
pub fn verify_entries<F, I, A>(
    prev: Option<&LogTreeHead>,
    head: &LogTreeHead,
    fetch_seed: F,
    entries: I,
    mut audit: A,
) -> Result<()>
where
    F: FnOnce(u64, u64) -> Result<LogInclusionProof>,
    I: IntoIterator<Item = Result<(u64, VerifiableEntry)>>,
    A: FnMut(u64, &VerifiableEntry) -> Result<()>,
{
    if prev.is_some_and(|p| head.tree_size <= p.tree_size) || head.tree_size == 0 {
        return Ok(());
    }

    let mut replay = match prev {
        Some(p) if p.tree_size > 0 => {
            let proof = fetch_seed(p.tree_size + 1, p.tree_size)?;
            LogReplay::resume(p, &proof)?
        }
        _ => LogReplay::new(),
    };

    for item in entries {
        if replay.next_index() == head.tree_size {
            break;
        }
        let (idx, entry) = item?;
        if idx != replay.next_index() {
            warn!(expected = replay.next_index(), got = idx, "entry stream out of order");
            return Err(VdsError::VerificationFailed);
        }
        audit(idx, &entry)?;
        replay.push(entry.leaf_hash()?);
    }

    if replay.next_index() != head.tree_size {
        warn!(
            received = replay.next_index(),
            expected = head.tree_size,
            "entry stream ended early"
        );
        return Err(VdsError::NotAllEntriesReturned);
    }

    if replay.root() != head.root_hash {
        warn!(tree_size = head.tree_size, "replayed entries do not match root");
        return Err(VdsError::VerificationFailed);
    }
    debug!(tree_size = head.tree_size, "entries verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLog;
    use crate::source::LogSource;

    fn log_of(n: u64) -> InMemoryLog {
        let mut log = InMemoryLog::new();
        for i in 0..n {
            log.append(VerifiableEntry::RawData(vec![i as u8])).unwrap();
        }
        log
    }

    #[test]
    fn resume_continues_from_previous_root() {
        let log = log_of(5);
        let prev = log.tree_head(3).unwrap();
        let proof = log.inclusion_proof_by_index(4, 3).unwrap();
        let mut replay = LogReplay::resume(&prev, &proof).unwrap();
        assert_eq!(replay.root(), prev.root_hash);

        replay.push(crate::crypto::leaf_hash(&[3]));
        replay.push(crate::crypto::leaf_hash(&[4]));
        assert_eq!(replay.head(), log.head());
    }

    #[test]
    fn resume_rejects_path_of_wrong_length() {
        let log = log_of(5);
        let prev = log.tree_head(3).unwrap();

        // folds to the right root but claims a single subtree for three leaves
        let collapsed = LogInclusionProof {
            leaf_hash: [0; 32],
            tree_size: 4,
            leaf_index: 3,
            audit_path: vec![prev.root_hash.unwrap()],
        };
        assert!(matches!(LogReplay::resume(&prev, &collapsed), Err(VdsError::VerificationFailed)));

        let mut padded = log.inclusion_proof_by_index(4, 3).unwrap();
        padded.audit_path.push([7; 32]);
        assert!(matches!(LogReplay::resume(&prev, &padded), Err(VdsError::VerificationFailed)));
    }
}
