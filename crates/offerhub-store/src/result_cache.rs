use std::sync::Arc;
use std::time::Duration;

use offerhub_core::SelectionResult;

use crate::kv::{keys, KeyValueStore};

/// Selection results cached per SKU under the product TTL.
///
/// Store failures never propagate: a failed read is a miss, a failed write
/// leaves the result uncached. Either way the request is answered from the
/// live fan-out.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ResultCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        ResultCache { store, ttl }
    }

    /// The cached result for `sku`, with `cache_hit` forced true.
    pub async fn get(&self, sku: &str) -> Option<SelectionResult> {
        let raw = match self.store.get(&keys::product(sku)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(sku, error = %error, "result cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<SelectionResult>(&raw) {
            Ok(mut result) => {
                result.cache_hit = true;
                Some(result)
            }
            Err(error) => {
                tracing::warn!(sku, error = %error, "dropping unreadable cached result");
                None
            }
        }
    }

    /// Cache `result` under its SKU with `cache_hit` forced false at write
    /// time.
    pub async fn set(&self, result: &SelectionResult) {
        let mut stored = result.clone();
        stored.cache_hit = false;

        let raw = match serde_json::to_string(&stored) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(sku = %stored.sku, error = %error, "failed to encode selection result");
                return;
            }
        };

        if let Err(error) = self.store.set(&keys::product(&stored.sku), raw, self.ttl).await {
            tracing::warn!(sku = %stored.sku, error = %error, "result cache write failed; continuing uncached");
        }
    }
}

#[cfg(test)]
mod tests {
    use offerhub_core::AvailabilityStatus;
    use rust_decimal::Decimal;

    use super::*;
    use crate::MemoryStore;

    fn cache_with_ttl(ttl: Duration) -> ResultCache {
        ResultCache::new(Arc::new(MemoryStore::new()), ttl)
    }

    fn sample(sku: &str) -> SelectionResult {
        SelectionResult {
            sku: sku.to_string(),
            best_vendor: Some("vendor1".to_string()),
            price: Some(Decimal::new(1850, 2)),
            stock: Some(15),
            status: AvailabilityStatus::Available,
            vendors_checked: 3,
            cache_hit: false,
        }
    }

    #[tokio::test]
    async fn round_trip_flips_cache_hit() {
        let cache = cache_with_ttl(Duration::from_secs(120));
        let result = sample("ABC123");

        cache.set(&result).await;
        let cached = cache.get("ABC123").await.unwrap();

        assert!(cached.cache_hit);
        assert_eq!(
            SelectionResult {
                cache_hit: false,
                ..cached
            },
            result
        );
    }

    #[tokio::test]
    async fn write_forces_cache_hit_false_even_if_input_claims_hit() {
        let cache = cache_with_ttl(Duration::from_secs(120));
        let mut result = sample("ABC123");
        result.cache_hit = true;

        cache.set(&result).await;
        let cached = cache.get("ABC123").await.unwrap();

        // Forced true by the read, not carried over from the write.
        assert!(cached.cache_hit);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = cache_with_ttl(Duration::from_secs(120));
        assert!(cache.get("MISSING9").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = cache_with_ttl(Duration::from_millis(50));
        cache.set(&sample("ABC123")).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("ABC123").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_cached_json_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(&keys::product("ABC123"), "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = ResultCache::new(store, Duration::from_secs(60));
        assert!(cache.get("ABC123").await.is_none());
    }
}
