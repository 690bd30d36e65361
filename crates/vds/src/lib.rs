//! Verifiable Data Structures
//!
//! Client-side verification of append-only Merkle logs and of sparse Merkle
//! maps whose roots are themselves logged.

mod b64;
mod crypto;
mod entry;
mod log_audit;
mod log_proof;
mod map_audit;
mod map_proof;
mod memory;
mod mutation;
mod nodestore;
mod objecthash;
mod ranges;
mod smt;
mod source;
mod types;
mod verifier;

pub use crypto::{default_leaf_values, empty_map_root, is_pow2, leaf_hash, node_hash, sha256, MAP_DEPTH};
pub use entry::{verify_object_hash, MerkleLeaf, VerifiableEntry};
pub use log_audit::{verify_entries, LogReplay};
pub use log_proof::{verify_consistency, verify_consistency_proof, verify_inclusion};
pub use map_audit::MapAuditor;
pub use map_proof::{key_path, root_from_path, verify_map_entry};
pub use memory::{InMemoryLog, InMemoryMap};
pub use mutation::MapMutation;
pub use nodestore::{InMemoryNodeStore, NodeId, NodeStore};
pub use objecthash::{float_normalize, object_hash, redactable, shed_redacted, ObjectHasher, REDACTED_PREFIX};
pub use ranges::{consistency_ranges, inclusion_ranges, root_of, subtree_hash, LeafRange};
pub use smt::SparseMerkleTree;
pub use source::{EntryStream, LogSource, MapSource};
pub use types::{
    Hash32, LogConsistencyProof, LogInclusionProof, LogTreeHead, MapEntryResponse, MapTreeHead, MapTreeState,
};
pub use verifier::{LogAnchor, VerifiableLog, VerifiableMap};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VdsError {
    #[error("Verification failed")]
    VerificationFailed,

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Not all entries returned")]
    NotAllEntriesReturned,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Not found")]
    NotFound,

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, VdsError>;
