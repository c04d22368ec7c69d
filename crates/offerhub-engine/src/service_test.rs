use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use offerhub_core::{AvailabilityStatus, CircuitPhase, VendorConfig, VendorFormat};
use offerhub_store::{
    KeyValueStore, MemoryStore, PerformanceTracker, PopularityTracker, ResultCache, StoreError,
};
use offerhub_vendors::{
    CircuitBreaker, CircuitBreakerConfig, FanOutAggregator, RetryPolicy, VendorError,
    VendorPipeline, VendorTransport,
};
use rust_decimal::Decimal;

use super::*;

const DAY: Duration = Duration::from_secs(86_400);

fn retail_body(sku: &str, price: f64, count: i64) -> String {
    serde_json::json!({
        "product_id": sku,
        "availability": "IN_STOCK",
        "inventory_count": count,
        "unit_price": price,
        "last_updated": Utc::now().to_rfc3339(),
    })
    .to_string()
}

/// Serves a fixed body and counts calls.
struct StaticTransport {
    body: String,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl VendorTransport for StaticTransport {
    async fn fetch(&self, _sku: &str) -> Result<String, VendorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Refuses every call, as a hard vendor outage would.
struct FailingTransport;

#[async_trait]
impl VendorTransport for FailingTransport {
    async fn fetch(&self, _sku: &str) -> Result<String, VendorError> {
        Err(VendorError::UnexpectedStatus {
            status: 500,
            url: "http://vendor1.internal/products/ABC123".to_string(),
        })
    }
}

/// Holds every fetch until released, so a test can keep one in flight.
struct GatedTransport {
    body: String,
    calls: Arc<AtomicU32>,
    gate: Arc<tokio::sync::Notify>,
}

#[async_trait]
impl VendorTransport for GatedTransport {
    async fn fetch(&self, _sku: &str) -> Result<String, VendorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.body.clone())
    }
}

/// A store with nothing behind it; every operation fails.
struct DownStore;

#[async_trait]
impl KeyValueStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn incr(&self, _key: &str, _ttl: Duration) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn update(
        &self,
        _key: &str,
        _ttl: Duration,
        _apply: Box<dyn FnOnce(Option<String>) -> String + Send>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

fn counted_vendor(body: String) -> (Arc<dyn VendorTransport>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let transport: Arc<dyn VendorTransport> = Arc::new(StaticTransport {
        body,
        calls: Arc::clone(&calls),
    });
    (transport, calls)
}

/// Wires a full service over the given transports: retail schema for every
/// vendor, no retries, default breaker, 10% premium threshold.
fn service_with(
    vendors: Vec<(&str, Arc<dyn VendorTransport>)>,
    store: Arc<dyn KeyValueStore>,
) -> ProductService {
    let pipelines = vendors
        .into_iter()
        .map(|(id, transport)| {
            VendorPipeline::new(
                VendorConfig {
                    id: id.to_string(),
                    format: VendorFormat::Retail,
                    base_url: format!("http://{id}.internal"),
                },
                transport,
                CircuitBreaker::new(id, CircuitBreakerConfig::default(), Arc::clone(&store)),
                RetryPolicy {
                    max_retries: 0,
                    backoff_base_ms: 0,
                },
                PerformanceTracker::new(Arc::clone(&store), DAY),
            )
        })
        .collect();

    ProductService::new(
        FanOutAggregator::new(pipelines, Duration::from_secs(600)),
        ResultCache::new(Arc::clone(&store), Duration::from_secs(120)),
        PopularityTracker::new(Arc::clone(&store), DAY),
        PerformanceTracker::new(store, DAY),
        Decimal::new(10, 2),
    )
}

#[tokio::test]
async fn miss_then_hit_serves_from_cache() {
    let (transport, calls) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let service = service_with(vec![("vendor1", transport)], Arc::new(MemoryStore::new()));

    let first = service.get_product("ABC123").await;
    assert_eq!(first.status, AvailabilityStatus::Available);
    assert_eq!(first.best_vendor.as_deref(), Some("vendor1"));
    assert_eq!(first.price, Some(Decimal::new(1850, 2)));
    assert!(!first.cache_hit);

    let second = service.get_product("ABC123").await;
    assert!(second.cache_hit);
    assert_eq!(second.best_vendor, first.best_vendor);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second lookup must not refetch");
}

#[tokio::test]
async fn selection_prefers_higher_stock_over_small_premium() {
    let (cheap, _) = counted_vendor(retail_body("ABC123", 10.00, 5));
    let (stocked, _) = counted_vendor(retail_body("ABC123", 12.00, 20));
    let service = service_with(
        vec![("vendor1", cheap), ("vendor2", stocked)],
        Arc::new(MemoryStore::new()),
    );

    let result = service.get_product("ABC123").await;
    assert_eq!(result.best_vendor.as_deref(), Some("vendor2"));
    assert_eq!(result.stock, Some(20));
    assert_eq!(result.vendors_checked, 2);
}

#[tokio::test]
async fn total_vendor_outage_is_cached_out_of_stock() {
    let failing: Arc<dyn VendorTransport> = Arc::new(FailingTransport);
    let service = service_with(vec![("vendor1", failing)], Arc::new(MemoryStore::new()));

    let first = service.get_product("ABC123").await;
    assert_eq!(first.status, AvailabilityStatus::OutOfStock);
    assert_eq!(first.vendors_checked, 0);
    assert!(!first.cache_hit);

    let second = service.get_product("ABC123").await;
    assert_eq!(second.status, AvailabilityStatus::OutOfStock);
    assert!(second.cache_hit, "a no-offer result is cached like any other");
}

#[tokio::test]
async fn popularity_counts_requests_not_prewarms() {
    let (transport, _) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let service = service_with(vec![("vendor1", transport)], Arc::new(MemoryStore::new()));

    service.get_product("ABC123").await;
    service.get_product("ABC123").await;
    assert!(service.prewarm_sku("DEF456").await);

    let counters = service.popular_skus().await;
    assert_eq!(counters.get("ABC123"), Some(&2));
    assert!(!counters.contains_key("DEF456"), "prewarm is not demand");
}

#[tokio::test]
async fn prewarm_fetches_once_and_reports_whether_it_did() {
    let (transport, calls) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let service = service_with(vec![("vendor1", transport)], Arc::new(MemoryStore::new()));

    assert!(service.prewarm_sku("ABC123").await, "cold SKU should be warmed");
    assert!(!service.prewarm_sku("ABC123").await, "warm SKU should be skipped");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let result = service.get_product("ABC123").await;
    assert!(result.cache_hit, "user request should ride the prewarmed entry");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_misses_for_one_sku_fan_out_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let gate = Arc::new(tokio::sync::Notify::new());
    let transport: Arc<dyn VendorTransport> = Arc::new(GatedTransport {
        body: retail_body("ABC123", 18.50, 15),
        calls: Arc::clone(&calls),
        gate: Arc::clone(&gate),
    });
    let service = Arc::new(service_with(
        vec![("vendor1", transport)],
        Arc::new(MemoryStore::new()),
    ));

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.get_product("ABC123").await }
    });
    let second = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.get_product("ABC123").await }
    });

    // Let both requests reach the flight before releasing the vendor.
    tokio::time::sleep(Duration::from_millis(50)).await;
    gate.notify_one();

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1, "followers must not fan out");
    assert_eq!(first.best_vendor.as_deref(), Some("vendor1"));
    assert_eq!(second.best_vendor, first.best_vendor);
    assert_eq!(service.popular_skus().await.get("ABC123"), Some(&2));
}

#[tokio::test]
async fn store_outage_degrades_to_live_lookups() {
    let (transport, calls) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let service = service_with(vec![("vendor1", transport)], Arc::new(DownStore));

    let first = service.get_product("ABC123").await;
    let second = service.get_product("ABC123").await;

    assert_eq!(first.status, AvailabilityStatus::Available);
    assert!(!first.cache_hit);
    assert!(!second.cache_hit, "nothing can be cached while the store is down");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(service.popular_skus().await.is_empty());
    let stats = service.performance_snapshot().await;
    assert_eq!(stats.get("vendor1").map(|s| s.total_calls), Some(0));
}

#[tokio::test]
async fn performance_snapshot_covers_quiet_vendors() {
    let (transport, _) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let idle: Arc<dyn VendorTransport> = Arc::new(FailingTransport);
    let service = service_with(
        vec![("vendor1", transport), ("vendor2", idle)],
        Arc::new(MemoryStore::new()),
    );

    let snapshot = service.performance_snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("vendor1").map(|s| s.total_calls), Some(0));
    assert_eq!(snapshot.get("vendor2").map(|s| s.total_calls), Some(0));
}

#[tokio::test]
async fn circuit_snapshot_tracks_failures_per_vendor() {
    let failing: Arc<dyn VendorTransport> = Arc::new(FailingTransport);
    let service = service_with(vec![("vendor1", failing)], Arc::new(MemoryStore::new()));

    assert_eq!(
        service
            .circuit_snapshot()
            .await
            .get("vendor1")
            .map(|state| state.state),
        Some(CircuitPhase::Closed)
    );

    // Distinct SKUs so every request misses the cache and reaches the vendor.
    for sku in ["AAA111", "BBB222", "CCC333"] {
        service.get_product(sku).await;
    }

    let snapshot = service.circuit_snapshot().await;
    let state = snapshot.get("vendor1").expect("vendor1 state");
    assert_eq!(state.state, CircuitPhase::Open);
    assert_eq!(state.consecutive_failures, 3);
}

#[tokio::test]
async fn top_skus_rank_by_request_count() {
    let (transport, _) = counted_vendor(retail_body("ABC123", 18.50, 15));
    let service = service_with(vec![("vendor1", transport)], Arc::new(MemoryStore::new()));

    for _ in 0..3 {
        service.get_product("HOT111").await;
    }
    service.get_product("COLD22").await;

    assert_eq!(service.top_skus(1).await, vec!["HOT111".to_string()]);
}
