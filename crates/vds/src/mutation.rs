//! Map mutation records as carried in a map's mutation log

use serde::{Deserialize, Serialize};

use crate::crypto::leaf_hash;
use crate::nodestore::NodeStore;
use crate::smt::SparseMerkleTree;
use crate::{Hash32, Result, VdsError, VerifiableEntry};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MapMutation {
    Set {
        #[serde(with = "crate::b64::bytes")]
        key: Vec<u8>,
        #[serde(with = "crate::b64::bytes")]
        value_leaf_input: Vec<u8>,
    },
    Delete {
        #[serde(with = "crate::b64::bytes")]
        key: Vec<u8>,
    },
    /// Applies only while the key's leaf hash is still `previous`.
    Update {
        #[serde(with = "crate::b64::bytes")]
        key: Vec<u8>,
        #[serde(with = "crate::b64::bytes")]
        value_leaf_input: Vec<u8>,
        #[serde(with = "crate::b64::hash")]
        previous: Hash32,
    },
}

impl MapMutation {
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Set { key, .. } | Self::Delete { key } | Self::Update { key, .. } => key,
        }
    }

    /// Leaf hash the key holds after this mutation, given what it held before.
    pub fn next_leaf(&self, current: &Hash32) -> Hash32 {
        match self {
            Self::Set { value_leaf_input, .. } => leaf_hash(value_leaf_input),
            Self::Delete { .. } => leaf_hash(&[]),
            Self::Update { value_leaf_input, previous, .. } => {
                if previous == current {
                    leaf_hash(value_leaf_input)
                } else {
                    *current
                }
            }
        }
    }

    /// Apply to `tree`, returning whether the leaf changed.
    pub fn apply<N: NodeStore>(&self, tree: &mut SparseMerkleTree<N>) -> bool {
        let current = tree.leaf(self.key());
        let next = self.next_leaf(&current);
        if next == current {
            return false;
        }
        tree.update(self.key(), next);
        true
    }

    pub fn to_entry(&self) -> Result<VerifiableEntry> {
        serde_json::to_value(self)
            .map(VerifiableEntry::Json)
            .map_err(|e| VdsError::Malformed(e.to_string()))
    }

    pub fn from_entry(entry: &VerifiableEntry) -> Result<Self> {
        match entry {
            VerifiableEntry::Json(doc) => {
                serde_json::from_value(doc.clone()).map_err(|e| VdsError::Malformed(format!("bad mutation: {e}")))
            }
            _ => Err(VdsError::Malformed("mutation log entry is not a JSON document".into())),
        }
    }
}
