//! Keyed Cache
//!
//! Grouped cache with deterministic key derivation, per-group key registries
//! for bulk invalidation, and transparent tiering across a fast and a slow
//! backing store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            KeyedCacheStore                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────────────────┐  │
//! │  │ Local layer  │    │  Fast tier   │    │  Slow tier (LZ4 frames)   │  │
//! │  │ (in-process) │───▶│ BackingStore │───▶│  BackingStore             │  │
//! │  └──────────────┘    └──────────────┘    └───────────────────────────┘  │
//! │                             │                                            │
//! │                   ┌─────────┴─────────┐     ┌──────────────────────┐    │
//! │                   │ GroupKeyRegistry  │     │   UsageClassifier    │    │
//! │                   └───────────────────┘     └──────────────────────┘    │
//! │                                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Keys** (`key.rs`): groups, request descriptors, SHA-256 key derivation
//! - **Entries** (`entry.rs`): the stored envelope and its expiry rule
//! - **Registry** (`registry.rs`): best-effort per-group key index
//! - **Codec** (`codec.rs`): slow-tier LZ4 framing
//! - **Counters** (`metrics.rs`): hit/miss and tier movement diagnostics
//! - **Store** (`store.rs`): the read/write/invalidate/maintenance surface
//!
//! # Usage
//!
//! ```rust,ignore
//! use erp_cache::cache::{CacheGroup, KeyedCacheStore, RequestDescriptor};
//!
//! let cache = KeyedCacheStore::in_memory(&config)?;
//! let req = RequestDescriptor::with_args("GetArticulosWS", json!({"id": 5}));
//! cache.set(&req, CacheGroup::Product, &payload, Some(Duration::from_secs(3600)));
//! let hit: Option<Value> = cache.get(&req, CacheGroup::Product);
//! ```

pub mod codec;
pub mod entry;
pub mod key;
pub mod metrics;
pub mod registry;
pub mod store;

#[cfg(test)]
mod proptest;

pub use codec::{ColdTierCodec, CompressionAlgorithm};
pub use entry::{CacheEntry, CacheTier, ENTRY_FORMAT_VERSION};
pub use key::{CacheGroup, CacheKey, RequestDescriptor};
pub use metrics::{CacheCounters, CacheStats, TierHits};
pub use registry::GroupKeyRegistry;
pub use store::{
    CompactionReport, EntryFootprint, EvictionReport, KeyedCacheStore, MigrationReport,
};
