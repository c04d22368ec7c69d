use std::time::Duration;

use async_trait::async_trait;

use crate::StoreError;

/// Key families shared by everything that touches the store. One flat
/// namespace, TTL per family.
pub mod keys {
    /// Cached selection results, `product:{sku}`.
    pub const PRODUCT_PREFIX: &str = "product:";
    /// Per-vendor call telemetry, `performance:{vendor}`.
    pub const PERFORMANCE_PREFIX: &str = "performance:";
    /// Persisted circuit breaker state, `circuit:{vendor}`.
    pub const CIRCUIT_PREFIX: &str = "circuit:";
    /// Per-SKU request counters, `sku_requests:{sku}`.
    pub const SKU_REQUESTS_PREFIX: &str = "sku_requests:";

    #[must_use]
    pub fn product(sku: &str) -> String {
        format!("{PRODUCT_PREFIX}{sku}")
    }

    #[must_use]
    pub fn performance(vendor_id: &str) -> String {
        format!("{PERFORMANCE_PREFIX}{vendor_id}")
    }

    #[must_use]
    pub fn circuit(vendor_id: &str) -> String {
        format!("{CIRCUIT_PREFIX}{vendor_id}")
    }

    #[must_use]
    pub fn sku_requests(sku: &str) -> String {
        format!("{SKU_REQUESTS_PREFIX}{sku}")
    }
}

/// A generic TTL'd key-value store holding string (JSON) values.
///
/// The trait is the seam between the pipeline and whatever backs it; the
/// bundled implementation is [`crate::MemoryStore`]. Callers treat every
/// error as "store unavailable" and degrade rather than fail.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// The live (unexpired) value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value and
    /// restarting the TTL clock.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically add one to the integer counter at `key` and return the new
    /// count. A missing, expired, or non-numeric value counts from zero. The
    /// TTL clock restarts on every increment.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Atomic read-modify-write: `apply` receives the live value (or `None`)
    /// and returns the replacement, all under one critical section, so
    /// concurrent updates to the same key can never lose each other.
    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        apply: Box<dyn FnOnce(Option<String>) -> String + Send>,
    ) -> Result<(), StoreError>;

    /// All live entries whose key starts with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Drop expired entries, returning how many were removed.
    async fn sweep(&self) -> Result<usize, StoreError>;
}
