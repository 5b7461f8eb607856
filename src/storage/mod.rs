//! Persistence: the two-tier cache and its debounced hash flushing.

pub mod cache;
pub mod debouncer;
pub mod flusher;

pub use cache::{CacheEntry, CacheStats, PersistenceCache};
pub use debouncer::{Clock, Debouncer, ManualClock, SystemClock};
pub use flusher::HashFlusher;
