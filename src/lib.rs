//! erp-cache - Tiered Cache and Adaptive Maintenance Engine
//!
//! Caching layer for a web-server process that synchronizes product, order
//! and pricing data from an ERP into a storefront. Responses are cached in a
//! fast tier with a slow tier for large or rarely used values, price records
//! live in a persistent record cache with an explicit lifecycle, and a
//! batch-driven scheduler keeps memory in check while a sync runs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  sync loop ──▶ AdaptiveMaintenanceScheduler ◀── external timer   │
//! │                   │            │                                 │
//! │                   ▼            ▼                                 │
//! │          KeyedCacheStore   PriceRecordCache                      │
//! │            │    │    │            │                              │
//! │       local  fast   slow     record store                        │
//! │                   │                                              │
//! │            UsageClassifier                                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - In-memory store, clocks, memory probes, event publishers
//! - [`cache`] - Keyed, group-scoped, two-tier response cache
//! - [`config`] - Validated configuration with YAML loading
//! - [`domain`] - Ports and domain events
//! - [`error`] - Error types
//! - [`maintenance`] - Memory-pressure driven cleanup
//! - [`metrics`] - Prometheus exporter
//! - [`records`] - Price record cache with lifecycle states
//! - [`usage`] - Access-frequency classification

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod records;
pub mod usage;

// Re-export commonly used types
pub use cache::{CacheGroup, CacheKey, CacheStats, KeyedCacheStore, RequestDescriptor};
pub use config::CacheSystemConfig;
pub use error::{Error, Result};
pub use maintenance::{AdaptiveMaintenanceScheduler, CleanupLevel, PassReport};
pub use metrics::CacheMetricsExporter;
pub use records::{PriceCacheRecord, PriceRecordCache, RecordState};
pub use usage::{AccessFrequency, UsageClassifier};
