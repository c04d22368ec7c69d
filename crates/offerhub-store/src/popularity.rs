use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::kv::{keys, KeyValueStore};

/// Per-SKU request counters under the popularity TTL, feeding the prewarm
/// job's ranking.
#[derive(Clone)]
pub struct PopularityTracker {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl PopularityTracker {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        PopularityTracker { store, ttl }
    }

    /// Count one request for `sku`. A dropped increment is logged and
    /// forgotten; popularity is telemetry, not truth.
    pub async fn increment(&self, sku: &str) {
        if let Err(error) = self.store.incr(&keys::sku_requests(sku), self.ttl).await {
            tracing::warn!(sku, error = %error, "dropping popularity increment; store unavailable");
        }
    }

    /// All live counters, keyed by SKU.
    pub async fn snapshot(&self) -> HashMap<String, u64> {
        let entries = match self.store.scan_prefix(keys::SKU_REQUESTS_PREFIX).await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(error = %error, "popularity scan failed; reporting empty");
                return HashMap::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|(key, value)| {
                let sku = key.strip_prefix(keys::SKU_REQUESTS_PREFIX)?.to_string();
                let count = value.parse::<u64>().ok()?;
                Some((sku, count))
            })
            .collect()
    }

    /// The `n` most requested SKUs, most popular first. Ties break on SKU so
    /// the ordering is stable across calls.
    pub async fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self.snapshot().await.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}
