//! Infrastructure Adapters
//!
//! Implementations of the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (domain::ports)                        │
//! │   BackingStore │ Clock │ MemoryProbe │ EventPublisher            │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │   InMemoryStore │ SystemClock, ManualClock                       │
//! │   StaticMemoryProbe, StoreUsageProbe, ProcessMemoryProbe         │
//! │   LoggingEventPublisher, InMemoryEventCollector                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod clock;
mod event_publisher;
mod memory_probe;
mod memory_store;

pub use clock::{ManualClock, SystemClock};
pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use memory_probe::{ProcessMemoryProbe, StaticMemoryProbe, StoreUsageProbe};
pub use memory_store::{InMemoryStore, InMemoryStoreStats};
