//! Price Cache Records
//!
//! One row per SKU. Rows are never deleted by reads: expiry and invalidation
//! are state transitions, and terminal rows stay for audit until cleanup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::key::{canonicalize, sha256_hex};
use crate::error::{Error, Result};

/// Lifecycle state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Expired,
    Invalidated,
}

impl RecordState {
    pub const ALL: [RecordState; 3] = [
        RecordState::Active,
        RecordState::Expired,
        RecordState::Invalidated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Active => "active",
            RecordState::Expired => "expired",
            RecordState::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown record state: {}", s)))
    }
}

/// Why a record is being taken out of service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// The source system reported a change
    Invalidated,
    /// Treat the row as past its TTL
    Expired,
}

impl From<InvalidationReason> for RecordState {
    fn from(reason: InvalidationReason) -> Self {
        match reason {
            InvalidationReason::Invalidated => RecordState::Invalidated,
            InvalidationReason::Expired => RecordState::Expired,
        }
    }
}

/// How an upsert changed the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// No row existed for the SKU
    Inserted,
    /// Content or state changed
    Updated,
    /// Same content hash on an active row; only timestamps were refreshed
    Unchanged,
}

/// Cached pricing and tariff information for one SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCacheRecord {
    pub sku: String,
    pub price: Option<f64>,
    pub tariff_conditions: Option<Value>,
    pub ttl_secs: u64,
    pub updated_at: DateTime<Utc>,
    /// Last transition between states, drives retention
    pub state_changed_at: DateTime<Utc>,
    pub data_hash: String,
    pub state: RecordState,
}

impl PriceCacheRecord {
    /// Content hash over `{price, tariff_conditions}`
    pub fn compute_hash(price: Option<f64>, tariff_conditions: Option<&Value>) -> String {
        let content = json!({
            "price": price,
            "tariff_conditions": tariff_conditions.map(canonicalize),
        });
        sha256_hex(canonicalize(&content).to_string().as_bytes())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// `updated_at + ttl`
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl())
            .ok()
            .and_then(|ttl| self.updated_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Past its TTL (strictly after `updated_at + ttl`)
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_active(&self) -> bool {
        self.state == RecordState::Active
    }

    /// Move to `state`, stamping the transition time
    pub fn transition(&mut self, state: RecordState, now: DateTime<Utc>) {
        if self.state != state {
            self.state = state;
            self.state_changed_at = now;
        }
    }
}
