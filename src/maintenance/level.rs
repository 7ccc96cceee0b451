//! Cleanup Levels
//!
//! Memory pressure maps to a pass interval and a cleanup level using the
//! same breakpoints:
//!
//! | usage      | interval (units) | level        |
//! |------------|------------------|--------------|
//! | >= 90%     | 1                | critical     |
//! | 80% - 89%  | 5                | aggressive   |
//! | 60% - 79%  | 10               | moderate     |
//! | < 60%      | 20               | light        |
//!
//! Each level runs every action of the levels below it.

use std::fmt;

use serde::{Deserialize, Serialize};

const CRITICAL_PERCENT: f64 = 90.0;
const AGGRESSIVE_PERCENT: f64 = 80.0;
const MODERATE_PERCENT: f64 = 60.0;

/// Units between maintenance passes at `memory_usage_percent`
pub fn interval_for(memory_usage_percent: f64) -> u64 {
    match memory_usage_percent {
        p if p >= CRITICAL_PERCENT => 1,
        p if p >= AGGRESSIVE_PERCENT => 5,
        p if p >= MODERATE_PERCENT => 10,
        _ => 20,
    }
}

/// Cleanup intensity at `memory_usage_percent`
pub fn level_for(memory_usage_percent: f64) -> CleanupLevel {
    match memory_usage_percent {
        p if p >= CRITICAL_PERCENT => CleanupLevel::Critical,
        p if p >= AGGRESSIVE_PERCENT => CleanupLevel::Aggressive,
        p if p >= MODERATE_PERCENT => CleanupLevel::Moderate,
        _ => CleanupLevel::Light,
    }
}

/// Whether a periodic pass is due on `batch_number`
pub fn should_migrate(batch_number: u64, interval: u64) -> bool {
    interval != 0 && batch_number % interval == 0
}

/// Cleanup intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupLevel {
    Light,
    Moderate,
    Aggressive,
    Critical,
}

impl CleanupLevel {
    pub const ALL: [CleanupLevel; 4] = [
        CleanupLevel::Light,
        CleanupLevel::Moderate,
        CleanupLevel::Aggressive,
        CleanupLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupLevel::Light => "light",
            CleanupLevel::Moderate => "moderate",
            CleanupLevel::Aggressive => "aggressive",
            CleanupLevel::Critical => "critical",
        }
    }

    /// Actions run at this level, in execution order
    pub fn actions(&self) -> &'static [MaintenanceAction] {
        use MaintenanceAction::*;
        static ALL_ACTIONS: [MaintenanceAction; 5] =
            [Compact, FlushLocal, MigrateCold, SweepExpired, EvictLru];

        let count = match self {
            CleanupLevel::Light => 1,
            CleanupLevel::Moderate => 2,
            CleanupLevel::Aggressive => 3,
            CleanupLevel::Critical => 5,
        };
        &ALL_ACTIONS[..count]
    }

    pub fn includes(&self, action: MaintenanceAction) -> bool {
        self.actions().contains(&action)
    }
}

impl fmt::Display for CleanupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One maintenance step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceAction {
    /// Release in-process memory (expired local entries, idle usage metrics)
    Compact,
    /// Drop the request-scoped cache layer
    FlushLocal,
    /// Move cold entries from the fast to the slow tier
    MigrateCold,
    /// Preventive LRU eviction from the fast tier
    EvictLru,
    /// Delete expired entries from both tiers
    SweepExpired,
    /// Purge non-active price records past retention (scheduled passes only)
    PurgeRecords,
}

impl MaintenanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceAction::Compact => "compact",
            MaintenanceAction::FlushLocal => "flush_local",
            MaintenanceAction::MigrateCold => "migrate_cold",
            MaintenanceAction::EvictLru => "evict_lru",
            MaintenanceAction::SweepExpired => "sweep_expired",
            MaintenanceAction::PurgeRecords => "purge_records",
        }
    }
}

impl fmt::Display for MaintenanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
