//! Log and map entry formats

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::crypto::leaf_hash;
use crate::objecthash::{object_hash, shed_redacted};
use crate::{Hash32, LogTreeHead, MapTreeHead, Result, VdsError};

/// Anything with a Merkle tree leaf hash.
pub trait MerkleLeaf {
    fn leaf_hash(&self) -> Result<Hash32>;
}

/// An already computed leaf hash.
impl MerkleLeaf for Hash32 {
    fn leaf_hash(&self) -> Result<Hash32> {
        Ok(*self)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VerifiableEntry {
    /// Bytes used as-is for the leaf.
    RawData(Vec<u8>),
    /// Leaf input is the object hash of the document.
    Json(Value),
    /// A document as returned with some members redacted. Hashes exactly like
    /// `Json`, so it verifies against the same leaf.
    RedactedJson(Value),
}

impl VerifiableEntry {
    /// Bytes fed to the leaf hash.
    pub fn leaf_input(&self) -> Result<Vec<u8>> {
        match self {
            Self::RawData(bytes) => Ok(bytes.clone()),
            Self::Json(doc) | Self::RedactedJson(doc) => Ok(object_hash(doc)?.to_vec()),
        }
    }

    /// Body sent when adding this entry.
    pub fn upload_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::RawData(bytes) => Ok(bytes.clone()),
            Self::Json(doc) | Self::RedactedJson(doc) => {
                serde_json::to_vec(doc).map_err(|e| VdsError::Malformed(e.to_string()))
            }
        }
    }

    /// Suffix appended to the add/get call for this format.
    pub fn format_suffix(&self) -> &'static str {
        match self {
            Self::RawData(_) => "",
            Self::Json(_) | Self::RedactedJson(_) => "/xjson",
        }
    }

    /// Data for application use. Redacted documents come back with redacted
    /// members dropped and nonce pairs unwrapped.
    pub fn data(&self) -> Result<Vec<u8>> {
        match self {
            Self::RawData(bytes) => Ok(bytes.clone()),
            Self::Json(doc) => serde_json::to_vec(doc).map_err(|e| VdsError::Malformed(e.to_string())),
            Self::RedactedJson(doc) => serde_json::to_vec(&shed_redacted(doc)?)
                .map_err(|e| VdsError::Malformed(e.to_string())),
        }
    }
}

impl MerkleLeaf for VerifiableEntry {
    fn leaf_hash(&self) -> Result<Hash32> {
        Ok(leaf_hash(&self.leaf_input()?))
    }
}

impl MerkleLeaf for MapTreeHead {
    fn leaf_hash(&self) -> Result<Hash32> {
        Ok(leaf_hash(&object_hash(&self.to_json())?))
    }
}

impl MerkleLeaf for LogTreeHead {
    fn leaf_hash(&self) -> Result<Hash32> {
        Ok(leaf_hash(&object_hash(&self.to_json())?))
    }
}

/// Check a server-supplied leaf input against the document it claims to hash.
pub fn verify_object_hash(entry: &VerifiableEntry, leaf_input: &[u8]) -> Result<()> {
    if entry.leaf_input()? != leaf_input {
        warn!(format = entry.format_suffix(), "leaf input does not match entry");
        return Err(VdsError::VerificationFailed);
    }
    Ok(())
}
