//! Persistent Record Cache
//!
//! Price and tariff data cached per SKU with explicit lifecycle states:
//!
//! ```text
//!            set                 get past ttl
//!   (none) ───────▶ active ─────────────────────▶ expired
//!                     │  ▲                           │
//!         invalidate  │  │ set                       │ cleanup after
//!                     ▼  │                           ▼ retention window
//!                 invalidated ─────────────────▶ (deleted)
//! ```

mod price_cache;
mod record;

pub use price_cache::{PriceRecordCache, RecordCacheStats};
pub use record::{InvalidationReason, PriceCacheRecord, RecordState, WriteOutcome};
