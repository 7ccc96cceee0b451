//! Usage Classifier
//!
//! Tracks per-key access frequency and derives the hot/cold classification
//! used by migration and eviction.
//!
//! # Scoring
//!
//! Every key carries an exponentially decayed access score: each access adds
//! 1.0, and the score halves every `half_life`. The score is mapped onto the
//! ordered [`AccessFrequency`] scale with doubling breakpoints:
//!
//! ```text
//! score:     0      (0,2)     [2,4)  [4,8)   [8,16)  >=16
//! tier:    never  very_low    low   medium   high  very_high
//! ```
//!
//! Both the decay and the mapping are monotone, so more frequent or more
//! recent access never yields a lower tier.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UsageConfig;
use crate::domain::ports::Clock;
use crate::error::{Error, Result};

// =============================================================================
// Access Frequency Scale
// =============================================================================

/// Ordered access frequency scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessFrequency {
    Never,
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AccessFrequency {
    /// Every tier, coldest first
    pub const ALL: [AccessFrequency; 6] = [
        AccessFrequency::Never,
        AccessFrequency::VeryLow,
        AccessFrequency::Low,
        AccessFrequency::Medium,
        AccessFrequency::High,
        AccessFrequency::VeryHigh,
    ];

    /// Numeric position on the scale
    pub fn score(&self) -> u8 {
        match self {
            AccessFrequency::Never => 0,
            AccessFrequency::VeryLow => 1,
            AccessFrequency::Low => 2,
            AccessFrequency::Medium => 3,
            AccessFrequency::High => 4,
            AccessFrequency::VeryHigh => 5,
        }
    }

    /// Map a decayed access score onto the scale
    pub fn from_decayed_score(score: f64) -> Self {
        if score.is_nan() || score <= 0.0 {
            AccessFrequency::Never
        } else if score < 2.0 {
            AccessFrequency::VeryLow
        } else if score < 4.0 {
            AccessFrequency::Low
        } else if score < 8.0 {
            AccessFrequency::Medium
        } else if score < 16.0 {
            AccessFrequency::High
        } else {
            AccessFrequency::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessFrequency::Never => "never",
            AccessFrequency::VeryLow => "very_low",
            AccessFrequency::Low => "low",
            AccessFrequency::Medium => "medium",
            AccessFrequency::High => "high",
            AccessFrequency::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for AccessFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccessFrequency::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown access frequency: {}", s)))
    }
}

// =============================================================================
// Usage Metrics
// =============================================================================

/// Access statistics for one cache key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageMetrics {
    pub access_frequency: AccessFrequency,
    pub last_access: DateTime<Utc>,
    pub access_count: u64,
    /// Decayed score as of `last_access`
    pub decayed_score: f64,
}

// =============================================================================
// Classifier
// =============================================================================

/// Per-key access tracker and hot/cold classifier
pub struct UsageClassifier {
    metrics: DashMap<String, UsageMetrics>,
    half_life: Duration,
    hot_threshold: AccessFrequency,
    max_tracked_keys: usize,
    clock: Arc<dyn Clock>,
}

impl UsageClassifier {
    /// Create a classifier from validated configuration
    pub fn new(config: &UsageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            metrics: DashMap::new(),
            half_life: config.half_life(),
            hot_threshold: config.hot_threshold,
            max_tracked_keys: config.max_tracked_keys,
            clock,
        }
    }

    /// Record one access to `key`
    pub fn record_access(&self, key: &str) {
        let now = self.clock.now();
        {
            let mut entry = self
                .metrics
                .entry(key.to_string())
                .or_insert_with(|| UsageMetrics {
                    access_frequency: AccessFrequency::Never,
                    last_access: now,
                    access_count: 0,
                    decayed_score: 0.0,
                });

            let score = self.decay(entry.decayed_score, entry.last_access, now) + 1.0;
            entry.decayed_score = score;
            entry.access_count += 1;
            entry.last_access = now;
            entry.access_frequency = AccessFrequency::from_decayed_score(score);
        }

        if self.metrics.len() > self.max_tracked_keys {
            self.trim_to_capacity();
        }
    }

    /// Current frequency tier of `key` (decayed to now)
    pub fn frequency(&self, key: &str) -> AccessFrequency {
        let now = self.clock.now();
        self.metrics
            .get(key)
            .map(|m| AccessFrequency::from_decayed_score(self.decay(m.decayed_score, m.last_access, now)))
            .unwrap_or(AccessFrequency::Never)
    }

    /// Whether `key` ranks at or above `threshold`.
    ///
    /// Keys without recorded metrics are always cold.
    pub fn classify(&self, key: &str, threshold: AccessFrequency) -> bool {
        if !self.metrics.contains_key(key) {
            return false;
        }
        self.frequency(key).score() >= threshold.score()
    }

    /// Classify against the configured hot threshold
    pub fn is_hot(&self, key: &str) -> bool {
        self.classify(key, self.hot_threshold)
    }

    /// Configured hot threshold
    pub fn hot_threshold(&self) -> AccessFrequency {
        self.hot_threshold
    }

    /// Metrics for `key`, with the frequency refreshed to now
    pub fn metrics(&self, key: &str) -> Option<UsageMetrics> {
        let now = self.clock.now();
        self.metrics.get(key).map(|m| {
            let mut snapshot = m.value().clone();
            snapshot.access_frequency =
                AccessFrequency::from_decayed_score(self.decay(m.decayed_score, m.last_access, now));
            snapshot
        })
    }

    /// Last access time of `key`
    pub fn last_access(&self, key: &str) -> Option<DateTime<Utc>> {
        self.metrics.get(key).map(|m| m.last_access)
    }

    /// Stop tracking `key`
    pub fn forget(&self, key: &str) {
        self.metrics.remove(key);
    }

    /// Drop metrics for keys idle longer than `max_idle`
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let max_idle = chrono::Duration::from_std(max_idle)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let before = self.metrics.len();
        self.metrics.retain(|_, m| now - m.last_access <= max_idle);
        self.metrics.shrink_to_fit();
        before.saturating_sub(self.metrics.len())
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Forget everything
    pub fn clear(&self) {
        self.metrics.clear();
    }

    /// Half-life of the decayed score
    pub fn half_life(&self) -> Duration {
        self.half_life
    }

    fn decay(&self, score: f64, since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - since).num_milliseconds().max(0) as f64 / 1000.0;
        let half_lives = elapsed / self.half_life.as_secs_f64();
        score * 0.5f64.powf(half_lives)
    }

    /// Remove the least recently seen tenth of the tracked keys
    fn trim_to_capacity(&self) {
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .metrics
            .iter()
            .map(|e| (e.key().clone(), e.value().last_access))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);

        let excess = self.metrics.len().saturating_sub(self.max_tracked_keys);
        let drop = excess.max(self.max_tracked_keys / 10).max(1);
        for (key, _) in by_age.into_iter().take(drop) {
            self.metrics.remove(&key);
        }
        debug!(dropped = drop, "Trimmed usage metrics to capacity");
    }
}

impl fmt::Debug for UsageClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageClassifier")
            .field("tracked_keys", &self.metrics.len())
            .field("half_life", &self.half_life)
            .field("hot_threshold", &self.hot_threshold)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
