pub mod kv;
pub mod memory;
pub mod performance;
pub mod popularity;
pub mod result_cache;

use thiserror::Error;

pub use kv::{keys, KeyValueStore};
pub use memory::MemoryStore;
pub use performance::PerformanceTracker;
pub use popularity::PopularityTracker;
pub use result_cache::ResultCache;

/// Failure talking to the backing key-value store. Callers degrade (miss,
/// dropped sample) instead of propagating; see the facade types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}
