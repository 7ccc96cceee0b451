//! Cache System Configuration
//!
//! Every recognised option is a named field with a default. Configuration is
//! validated once, when the components that consume it are constructed, and
//! rejected with [`Error::Config`] rather than silently corrected.
//!
//! # Example
//!
//! ```yaml
//! namespace: storefront
//! group_ttls:
//!   product_secs: 7200
//! maintenance:
//!   max_cache_bytes: 134217728
//!   eviction_cap: 250
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheGroup;
use crate::error::{Error, Result};
use crate::usage::AccessFrequency;

/// Values above this many serialized bytes go to the slow tier (1 MiB)
pub const DEFAULT_LARGE_VALUE_THRESHOLD: usize = 1024 * 1024;

/// Upper bound accepted for a cached price
pub const DEFAULT_MAX_PRICE: f64 = 999_999.99;

// =============================================================================
// Root Configuration
// =============================================================================

/// Configuration for the whole cache subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSystemConfig {
    /// Key prefix owned by this subsystem in the backing stores
    pub namespace: String,

    /// Serialized size above which a value is written to the slow tier
    pub large_value_threshold: usize,

    /// Maximum entries held by the in-process request-scoped layer
    pub local_max_entries: usize,

    /// Default TTL per cache group
    pub group_ttls: GroupTtlConfig,

    /// Usage classification settings
    pub usage: UsageConfig,

    /// Price record cache settings
    pub records: RecordCacheConfig,

    /// Adaptive maintenance settings
    pub maintenance: MaintenanceConfig,
}

impl Default for CacheSystemConfig {
    fn default() -> Self {
        Self {
            namespace: "erp_cache".to_string(),
            large_value_threshold: DEFAULT_LARGE_VALUE_THRESHOLD,
            local_max_entries: 1024,
            group_ttls: GroupTtlConfig::default(),
            usage: UsageConfig::default(),
            records: RecordCacheConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl CacheSystemConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option against its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::Config("namespace must not be empty".into()));
        }
        if self.namespace.contains(':') {
            return Err(Error::Config(format!(
                "namespace {:?} must not contain ':'",
                self.namespace
            )));
        }
        if self.large_value_threshold == 0 {
            return Err(Error::Config(
                "large_value_threshold must be greater than zero".into(),
            ));
        }
        self.group_ttls.validate()?;
        self.usage.validate()?;
        self.records.validate()?;
        self.maintenance.validate()?;
        Ok(())
    }
}

// =============================================================================
// Group TTLs
// =============================================================================

/// Default time-to-live per cache group, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupTtlConfig {
    pub product_secs: u64,
    pub order_secs: u64,
    pub config_secs: u64,
    pub global_secs: u64,
}

impl Default for GroupTtlConfig {
    fn default() -> Self {
        Self {
            product_secs: 3600,
            order_secs: 300,
            config_secs: 86_400,
            global_secs: 1800,
        }
    }
}

impl GroupTtlConfig {
    /// TTL applied when a write does not override it
    pub fn ttl_for(&self, group: CacheGroup) -> Duration {
        let secs = match group {
            CacheGroup::Product => self.product_secs,
            CacheGroup::Order => self.order_secs,
            CacheGroup::Config => self.config_secs,
            CacheGroup::Global => self.global_secs,
        };
        Duration::from_secs(secs)
    }

    fn validate(&self) -> Result<()> {
        for group in CacheGroup::ALL {
            if self.ttl_for(group).is_zero() {
                return Err(Error::Config(format!(
                    "TTL for group {} must be greater than zero",
                    group
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Usage Classification
// =============================================================================

/// Settings for access-frequency tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsageConfig {
    /// Half-life of the decayed access score
    pub half_life_secs: u64,

    /// Minimum frequency tier considered hot
    pub hot_threshold: AccessFrequency,

    /// Upper bound on tracked keys; least recently seen are dropped beyond it
    pub max_tracked_keys: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            half_life_secs: 3600,
            hot_threshold: AccessFrequency::Medium,
            max_tracked_keys: 100_000,
        }
    }
}

impl UsageConfig {
    /// Half-life as a duration
    pub fn half_life(&self) -> Duration {
        Duration::from_secs(self.half_life_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.half_life_secs == 0 {
            return Err(Error::Config("usage.half_life_secs must be greater than zero".into()));
        }
        if self.max_tracked_keys == 0 {
            return Err(Error::Config(
                "usage.max_tracked_keys must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Price Record Cache
// =============================================================================

/// Settings for the persistent price record cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordCacheConfig {
    /// TTL for records written without an explicit one
    pub default_ttl_secs: u64,

    /// Age after which non-active rows are purged
    pub retention_days: u32,

    /// Highest accepted price
    pub max_price: f64,
}

impl Default for RecordCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            retention_days: 7,
            max_price: DEFAULT_MAX_PRICE,
        }
    }
}

impl RecordCacheConfig {
    /// Default record TTL as a duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.default_ttl_secs == 0 {
            return Err(Error::Config(
                "records.default_ttl_secs must be greater than zero".into(),
            ));
        }
        if !self.max_price.is_finite() || self.max_price <= 0.0 {
            return Err(Error::Config(format!(
                "records.max_price must be a positive number, got {}",
                self.max_price
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Adaptive Maintenance
// =============================================================================

/// Settings for the adaptive maintenance scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Hard ceiling for the fast tier, in bytes
    pub max_cache_bytes: u64,

    /// Fraction of the ceiling that triggers (and is the target of) eviction
    pub eviction_ratio: f64,

    /// Maximum entries evicted in one pass
    pub eviction_cap: usize,

    /// Maximum entries migrated to the cold tier in one pass
    pub migration_cap: usize,

    /// Units between lightweight housekeeping passes
    pub housekeeping_every: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_cache_bytes: 64 * 1024 * 1024,
            eviction_ratio: 0.8,
            eviction_cap: 500,
            migration_cap: 1000,
            housekeeping_every: 50,
        }
    }
}

impl MaintenanceConfig {
    /// Size above which preventive eviction starts
    pub fn eviction_threshold_bytes(&self) -> u64 {
        (self.max_cache_bytes as f64 * self.eviction_ratio) as u64
    }

    fn validate(&self) -> Result<()> {
        if self.max_cache_bytes == 0 {
            return Err(Error::Config(
                "maintenance.max_cache_bytes must be greater than zero".into(),
            ));
        }
        if !(self.eviction_ratio > 0.0 && self.eviction_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "maintenance.eviction_ratio must be within (0, 1], got {}",
                self.eviction_ratio
            )));
        }
        if self.eviction_cap == 0 || self.migration_cap == 0 {
            return Err(Error::Config(
                "maintenance caps must be greater than zero".into(),
            ));
        }
        if self.housekeeping_every == 0 {
            return Err(Error::Config(
                "maintenance.housekeeping_every must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
