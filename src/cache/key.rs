//! Cache Keys and Groups
//!
//! A cache key is a SHA-256 digest of the group name, the request endpoint and
//! a digest of the canonically serialized arguments:
//!
//! ```text
//! key = sha256(group ":" endpoint ":" sha256(canonical_json(args)))
//! ```
//!
//! Object members are sorted before hashing, so two argument maps that differ
//! only in member order always produce the same key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// =============================================================================
// Cache Groups
// =============================================================================

/// Partition of cache keys used for bulk invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheGroup {
    Product,
    Order,
    Config,
    Global,
}

impl CacheGroup {
    /// Every group
    pub const ALL: [CacheGroup; 4] = [
        CacheGroup::Product,
        CacheGroup::Order,
        CacheGroup::Config,
        CacheGroup::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheGroup::Product => "product",
            CacheGroup::Order => "order",
            CacheGroup::Config => "config",
            CacheGroup::Global => "global",
        }
    }
}

impl fmt::Display for CacheGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CacheGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown cache group: {}", s)))
    }
}

// =============================================================================
// Request Descriptor
// =============================================================================

/// The logical request a cached value answers: an ERP endpoint plus its
/// argument set
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: String,
    args: Value,
}

impl RequestDescriptor {
    /// Descriptor without arguments
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            args: Value::Null,
        }
    }

    /// Descriptor with an argument set
    pub fn with_args(endpoint: impl Into<String>, args: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            args,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    /// Arguments serialized with object members in sorted order
    pub fn canonical_args(&self) -> String {
        canonicalize(&self.args).to_string()
    }
}

/// Rebuild `value` with every object's members inserted in sorted order.
///
/// Inserting in order keeps the result canonical whether or not the
/// `serde_json/preserve_order` feature is enabled somewhere in the build.
pub(crate) fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::with_capacity(members.len());
            for (k, v) in members {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

pub(crate) fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

// =============================================================================
// Cache Key
// =============================================================================

/// Derived cache key (64 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `descriptor` within `group`
    pub fn derive(group: CacheGroup, descriptor: &RequestDescriptor) -> Self {
        let args_hash = sha256_hex(descriptor.canonical_args().as_bytes());
        let material = format!("{}:{}:{}", group.as_str(), descriptor.endpoint(), args_hash);
        Self(sha256_hex(material.as_bytes()))
    }

    /// Accept a precomputed key
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == 64
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::CorruptEntry {
                key: raw.to_string(),
                reason: "cache keys are 64 lowercase hex characters".into(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
