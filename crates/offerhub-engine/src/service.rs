use std::collections::HashMap;

use offerhub_core::{CircuitState, SelectionResult, VendorPerformanceStats};
use offerhub_store::{PerformanceTracker, PopularityTracker, ResultCache};
use offerhub_vendors::FanOutAggregator;
use rust_decimal::Decimal;

use crate::inflight::{Flight, InflightRequests};
use crate::selection::select;

/// The product lookup facade: popularity counting, result cache,
/// single-flight vendor fan-out, selection, and the operator projections.
/// One instance serves the whole process.
pub struct ProductService {
    aggregator: FanOutAggregator,
    cache: ResultCache,
    popularity: PopularityTracker,
    perf: PerformanceTracker,
    inflight: InflightRequests,
    premium_threshold: Decimal,
}

impl ProductService {
    #[must_use]
    pub fn new(
        aggregator: FanOutAggregator,
        cache: ResultCache,
        popularity: PopularityTracker,
        perf: PerformanceTracker,
        premium_threshold: Decimal,
    ) -> Self {
        ProductService {
            aggregator,
            cache,
            popularity,
            perf,
            inflight: InflightRequests::new(),
            premium_threshold,
        }
    }

    /// Best available price and stock for `sku`.
    ///
    /// Counts the request, answers from cache when possible, and otherwise
    /// joins the single flight for this SKU: the leader fans out to every
    /// vendor, selects, and caches, while concurrent requesters await the
    /// leader's result instead of fanning out again.
    pub async fn get_product(&self, sku: &str) -> SelectionResult {
        self.popularity.increment(sku).await;

        if let Some(result) = self.cache.get(sku).await {
            tracing::debug!(sku, "serving cached result");
            return result;
        }

        match self.inflight.join(sku) {
            Flight::Leader(permit) => {
                let result = self.fetch_and_cache(sku).await;
                permit.complete(&result);
                result
            }
            Flight::Follower(mut receiver) => match receiver.recv().await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(sku, "in-flight fetch went away; fetching directly");
                    self.fetch_and_cache(sku).await
                }
            },
        }
    }

    /// Warm the cache for `sku` without counting it as demand, so the
    /// prewarm loop cannot feed its own ranking. Returns true when this call
    /// performed the warming fetch.
    pub async fn prewarm_sku(&self, sku: &str) -> bool {
        if self.cache.get(sku).await.is_some() {
            return false;
        }

        match self.inflight.join(sku) {
            Flight::Leader(permit) => {
                let result = self.fetch_and_cache(sku).await;
                permit.complete(&result);
                true
            }
            Flight::Follower(mut receiver) => {
                let _ = receiver.recv().await;
                false
            }
        }
    }

    /// Call stats for every vendor on the roster, quiet vendors included.
    pub async fn performance_snapshot(&self) -> HashMap<String, VendorPerformanceStats> {
        let mut snapshot = HashMap::new();
        for vendor_id in self.aggregator.vendor_ids() {
            let stats = self.perf.stats_for(&vendor_id).await;
            snapshot.insert(vendor_id, stats);
        }
        snapshot
    }

    /// Current breaker state per vendor.
    pub async fn circuit_snapshot(&self) -> HashMap<String, CircuitState> {
        self.aggregator.circuit_snapshot().await
    }

    /// Live request counters per SKU.
    pub async fn popular_skus(&self) -> HashMap<String, u64> {
        self.popularity.snapshot().await
    }

    /// The `n` most requested SKUs, most requested first.
    pub async fn top_skus(&self, n: usize) -> Vec<String> {
        self.popularity
            .top_n(n)
            .await
            .into_iter()
            .map(|(sku, _)| sku)
            .collect()
    }

    async fn fetch_and_cache(&self, sku: &str) -> SelectionResult {
        let offers = self.aggregator.fetch_all(sku).await;
        let result = select(sku, &offers, self.premium_threshold);
        tracing::info!(
            sku,
            vendors_checked = result.vendors_checked,
            status = %result.status,
            best_vendor = result.best_vendor.as_deref().unwrap_or("none"),
            "selection settled"
        );
        self.cache.set(&result).await;
        result
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
