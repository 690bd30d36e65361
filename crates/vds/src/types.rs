//! Core types for log and map verification

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entry::VerifiableEntry;
use crate::{b64, Result, VdsError};

/// 32-byte hash
pub type Hash32 = [u8; 32];

/// Size and root hash identifying one version of a log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTreeHead {
    pub tree_size: u64,
    /// Absent iff `tree_size == 0`
    pub root_hash: Option<Hash32>,
}

impl LogTreeHead {
    pub fn new(tree_size: u64, root_hash: Option<Hash32>) -> Result<Self> {
        if (tree_size == 0) != root_hash.is_none() {
            return Err(VdsError::InvalidRange(format!(
                "tree size {tree_size} does not agree with root hash presence"
            )));
        }
        Ok(Self { tree_size, root_hash })
    }

    pub fn empty() -> Self {
        Self { tree_size: 0, root_hash: None }
    }

    /// JSON record used when a log head is itself logged.
    pub fn to_json(&self) -> Value {
        json!({
            "tree_size": self.tree_size,
            "root_hash": self.root_hash.as_ref().map(b64::encode),
        })
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let record: LogHeadRecord = serde_json::from_value(value.clone())
            .map_err(|e| VdsError::Malformed(e.to_string()))?;
        record.into_head()
    }
}

#[derive(Deserialize)]
struct LogHeadRecord {
    tree_size: u64,
    root_hash: Option<String>,
}

impl LogHeadRecord {
    fn into_head(self) -> Result<LogTreeHead> {
        let root_hash = self.root_hash.as_deref().map(b64::decode_hash).transpose()?;
        LogTreeHead::new(self.tree_size, root_hash)
    }
}

/// Sparse map root after all mutations through `mutation_log.tree_size`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTreeHead {
    pub mutation_log: LogTreeHead,
    pub root_hash: Hash32,
}

impl MapTreeHead {
    pub fn tree_size(&self) -> u64 {
        self.mutation_log.tree_size
    }

    /// Canonical record whose object hash is logged in the tree head log.
    pub fn to_json(&self) -> Value {
        json!({
            "mutation_log": self.mutation_log.to_json(),
            "root_hash": b64::encode(&self.root_hash),
        })
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        #[derive(Deserialize)]
        struct MapHeadRecord {
            mutation_log: Value,
            root_hash: String,
        }

        let record: MapHeadRecord = serde_json::from_value(value.clone())
            .map_err(|e| VdsError::Malformed(e.to_string()))?;
        Ok(Self {
            mutation_log: LogTreeHead::from_json(&record.mutation_log)?,
            root_hash: b64::decode_hash(&record.root_hash)?,
        })
    }
}

/// A map head bound to the tree head log head that was proven to contain it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTreeState {
    pub map_head: MapTreeHead,
    pub tree_head_log_head: LogTreeHead,
}

impl MapTreeState {
    pub fn tree_size(&self) -> u64 {
        self.map_head.tree_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogInclusionProof {
    /// Not part of the wire response; filled in by the caller that asked.
    #[serde(skip)]
    pub leaf_hash: Hash32,
    pub tree_size: u64,
    pub leaf_index: u64,
    /// Sibling hashes from leaf to root
    pub audit_path: Vec<Hash32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConsistencyProof {
    #[serde(rename = "from_size")]
    pub first_size: u64,
    #[serde(rename = "tree_size")]
    pub second_size: u64,
    pub audit_path: Vec<Hash32>,
}

/// A map value with its 256-level audit path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntryResponse {
    pub key: Vec<u8>,
    pub value: VerifiableEntry,
    pub tree_size: u64,
    /// Index 0 is the sibling just below the root, 255 the leaf's sibling.
    /// `None` means the default value for that level.
    pub audit_path: Vec<Option<Hash32>>,
}
