//! Canonical hashing of JSON values.
//!
//! Every value hashes as `H(tag || payload)` with a one-byte type tag, so the
//! digest does not depend on member order or on how the JSON was formatted.
//! Strings starting with the redaction prefix stand in for a sub-object whose
//! hash is hex-encoded after the prefix; the digest of a document is the same
//! whether such members are present in full or redacted.

use std::fmt::Write as _;

use rand_core::{OsRng, RngCore};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::{Hash32, Result, VdsError};

/// Marker used by the server for redacted members.
pub const REDACTED_PREFIX: &str = "***REDACTED*** Hash: ";

const MAX_FLOAT_LEN: usize = 1000;
const NONCE_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHasher {
    redaction_prefix: Option<String>,
}

impl Default for ObjectHasher {
    fn default() -> Self {
        Self::standard()
    }
}

impl ObjectHasher {
    pub fn standard() -> Self {
        Self::with_prefix(REDACTED_PREFIX)
    }

    pub fn without_redaction() -> Self {
        Self { redaction_prefix: None }
    }

    /// An empty prefix disables redaction.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self { redaction_prefix: (!prefix.is_empty()).then_some(prefix) }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.redaction_prefix.as_deref()
    }

    fn redacted_digest<'a>(&self, s: &'a str) -> Option<&'a str> {
        self.prefix().and_then(|p| s.strip_prefix(p))
    }

    pub fn hash(&self, value: &Value) -> Result<Hash32> {
        match value {
            Value::Null => Ok(tagged(b'n', b"")),
            Value::Bool(b) => Ok(tagged(b'b', if *b { b"1" } else { b"0" })),
            Value::Number(n) => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| VdsError::Encoding(format!("number {n} has no f64 form")))?;
                Ok(tagged(b'f', float_normalize(f)?.as_bytes()))
            }
            Value::String(s) => self.hash_str(s),
            Value::Array(items) => {
                let mut buf = Vec::with_capacity(items.len() * 32);
                for item in items {
                    buf.extend_from_slice(&self.hash(item)?);
                }
                Ok(tagged(b'l', &buf))
            }
            Value::Object(members) => {
                let mut pairs = Vec::with_capacity(members.len());
                for (k, v) in members {
                    let mut pair = [0u8; 64];
                    pair[..32].copy_from_slice(&self.hash_str(k)?);
                    pair[32..].copy_from_slice(&self.hash(v)?);
                    pairs.push(pair);
                }
                pairs.sort_unstable();
                Ok(tagged(b'd', &pairs.concat()))
            }
        }
    }

    fn hash_str(&self, s: &str) -> Result<Hash32> {
        if let Some(digest) = self.redacted_digest(s) {
            let bytes = hex::decode(digest)
                .map_err(|e| VdsError::Encoding(format!("redacted digest is not hex: {e}")))?;
            return Hash32::try_from(bytes.as_slice()).map_err(|_| {
                VdsError::Encoding(format!("redacted digest has {} bytes", bytes.len()))
            });
        }
        let normalized: String = s.nfc().collect();
        Ok(tagged(b'u', normalized.as_bytes()))
    }

    /// Strip redacted members and unwrap `[nonce, value]` pairs, recursively.
    pub fn shed_redacted(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.shed_redacted(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(members) => {
                let mut out = Map::new();
                for (k, v) in members {
                    match v {
                        Value::Array(pair) if pair.len() == 2 => {
                            out.insert(k.clone(), self.shed_redacted(&pair[1])?);
                        }
                        Value::String(s) if self.redacted_digest(s).is_some() => {}
                        _ => {
                            return Err(VdsError::Malformed(format!(
                                "member {k:?} is neither a redactable pair nor redacted"
                            )))
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Replace `member`'s `[nonce, value]` pair with its redaction string.
    /// The object hash of the document does not change.
    pub fn redact(&self, value: &Value, member: &str) -> Result<Value> {
        let prefix = self
            .prefix()
            .ok_or_else(|| VdsError::Encoding("redaction is disabled for this hasher".into()))?;
        let Value::Object(members) = value else {
            return Err(VdsError::Malformed("only object members can be redacted".into()));
        };
        let pair = match members.get(member) {
            Some(pair @ Value::Array(items)) if items.len() == 2 => pair,
            Some(_) => {
                return Err(VdsError::Malformed(format!("member {member:?} is not a redactable pair")))
            }
            None => return Err(VdsError::NotFound),
        };

        let digest = self.hash(pair)?;
        let mut out = members.clone();
        out.insert(member.to_string(), Value::String(format!("{prefix}{}", hex::encode(digest))));
        Ok(Value::Object(out))
    }
}

fn tagged(tag: u8, payload: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update([tag]);
    hasher.update(payload);
    hasher.finalize().into()
}

/// Object hash with the standard redaction prefix.
pub fn object_hash(value: &Value) -> Result<Hash32> {
    ObjectHasher::standard().hash(value)
}

/// `shed_redacted` with the standard redaction prefix.
pub fn shed_redacted(value: &Value) -> Result<Value> {
    ObjectHasher::standard().shed_redacted(value)
}

/// Wrap every object member value in a `[nonce, value]` pair so that members
/// can later be redacted individually.
pub fn redactable(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(redactable).collect()),
        Value::Object(members) => Value::Object(
            members
                .iter()
                .map(|(k, v)| {
                    let mut nonce = [0u8; NONCE_LEN];
                    OsRng.fill_bytes(&mut nonce);
                    (k.clone(), Value::Array(vec![Value::String(hex::encode(nonce)), redactable(v)]))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Canonical text form of a number: sign, binary exponent, then mantissa bits.
///
/// The magnitude is scaled into `(0.5, 1]`; zero of either sign is `+0:`.
pub fn float_normalize(f: f64) -> Result<String> {
    if !f.is_finite() {
        return Err(VdsError::Encoding(format!("cannot normalize {f}")));
    }
    if f == 0.0 {
        return Ok("+0:".to_string());
    }

    let mut s = String::from(if f < 0.0 { "-" } else { "+" });
    let mut o = f.abs();
    let mut e: i32 = 0;
    while o > 1.0 {
        o /= 2.0;
        e += 1;
    }
    while o <= 0.5 {
        o *= 2.0;
        e -= 1;
    }
    let _ = write!(s, "{e}:");
    if o > 1.0 || o <= 0.5 {
        return Err(VdsError::Encoding(format!("could not normalize {f}")));
    }

    while o != 0.0 {
        if o >= 1.0 {
            s.push('1');
            o -= 1.0;
        } else {
            s.push('0');
        }
        if o >= 1.0 || s.len() >= MAX_FLOAT_LEN {
            return Err(VdsError::Encoding(format!("could not encode mantissa of {f}")));
        }
        o *= 2.0;
    }
    Ok(s)
}
