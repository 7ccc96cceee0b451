//! Domain Layer
//!
//! Ports the cache core depends on and the events it emits.
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for external collaborators
//! - **Events** (`events.rs`) - Cache events for audit and observability

pub mod events;
pub mod ports;

pub use events::CacheEvent;
pub use ports::{BackingStore, Clock, EventPublisher, MemoryProbe, StoreUsage};
