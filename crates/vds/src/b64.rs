//! Standard base64 for byte strings embedded in JSON records

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

use crate::{Hash32, Result, VdsError};

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| VdsError::Malformed(format!("bad base64: {e}")))
}

pub fn decode_hash(s: &str) -> Result<Hash32> {
    let bytes = decode(s)?;
    Hash32::try_from(bytes.as_slice())
        .map_err(|_| VdsError::Malformed(format!("expected 32 byte hash, got {}", bytes.len())))
}

/// `#[serde(with = "crate::b64::bytes")]`
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "crate::b64::hash")]`
pub mod hash {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Hash32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Hash32, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_hash(&s).map_err(serde::de::Error::custom)
    }
}
