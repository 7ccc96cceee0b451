//! Cache Entry Envelope
//!
//! What the keyed cache actually writes to a backing store: the value plus
//! the metadata needed to answer reads without trusting the store's own TTL.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::{CacheGroup, CacheKey};
use crate::error::{Error, Result};

/// Envelope format written by this version
pub const ENTRY_FORMAT_VERSION: u32 = 2;

/// Where a value was found or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// In-process request-scoped layer
    Local,
    /// Fast/ephemeral backing store
    Fast,
    /// Slow/large-object backing store
    Slow,
    /// Raw value written by an older format version
    Legacy,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Fast => "fast",
            CacheTier::Slow => "slow",
            CacheTier::Legacy => "legacy",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached value associated with one logical request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "v")]
    pub version: u32,
    pub key: CacheKey,
    pub group: CacheGroup,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry that expires `ttl` after `created_at`
    pub fn new(
        key: CacheKey,
        group: CacheGroup,
        value: Value,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            version: ENTRY_FORMAT_VERSION,
            key,
            group,
            value,
            created_at,
            expires_at,
        }
    }

    /// Visible strictly before `expires_at`
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_expired(now) {
            return None;
        }
        (self.expires_at - now).to_std().ok()
    }

    /// Serialized size of the value alone
    pub fn value_size(&self) -> usize {
        serde_json::to_vec(&self.value).map(|v| v.len()).unwrap_or(0)
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode an envelope read from `storage_key`
    pub fn from_bytes(storage_key: &str, bytes: &[u8]) -> Result<Self> {
        let entry: CacheEntry =
            serde_json::from_slice(bytes).map_err(|e| Error::CorruptEntry {
                key: storage_key.to_string(),
                reason: e.to_string(),
            })?;

        if entry.version > ENTRY_FORMAT_VERSION {
            return Err(Error::CorruptEntry {
                key: storage_key.to_string(),
                reason: format!("unsupported entry format version {}", entry.version),
            });
        }
        Ok(entry)
    }
}
