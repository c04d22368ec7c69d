use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use offerhub_core::VendorPerformanceStats;

use crate::kv::{keys, KeyValueStore};

/// Per-vendor call telemetry, one record per vendor under the performance
/// TTL.
///
/// Each `record` is a single atomic store update, so concurrent callers can
/// never lose each other's samples and `successes + failures == total_calls`
/// holds under any interleaving.
#[derive(Clone)]
pub struct PerformanceTracker {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl PerformanceTracker {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        PerformanceTracker { store, ttl }
    }

    /// Record one call outcome. `latency_ms` covers the transport attempt,
    /// successful or not; the running mean includes failed calls.
    pub async fn record(&self, vendor_id: &str, success: bool, latency_ms: f64, now: DateTime<Utc>) {
        let vendor = vendor_id.to_string();
        let apply = Box::new(move |current: Option<String>| {
            let mut stats = current
                .and_then(|raw| serde_json::from_str::<VendorPerformanceStats>(&raw).ok())
                .unwrap_or_else(|| VendorPerformanceStats::empty(&vendor));

            stats.total_calls += 1;
            if success {
                stats.successes += 1;
            } else {
                stats.failures += 1;
                stats.last_failure_at = Some(now);
            }

            #[allow(clippy::cast_precision_loss)]
            let n = stats.total_calls as f64;
            stats.avg_latency_ms = (stats.avg_latency_ms * (n - 1.0) + latency_ms) / n;

            serde_json::to_string(&stats).unwrap_or_default()
        });

        if let Err(error) = self
            .store
            .update(&keys::performance(vendor_id), self.ttl, apply)
            .await
        {
            tracing::warn!(vendor_id, error = %error, "dropping performance sample; store unavailable");
        }
    }

    /// Current stats for `vendor_id`; zeroed stats when none are recorded or
    /// the store is unavailable.
    pub async fn stats_for(&self, vendor_id: &str) -> VendorPerformanceStats {
        match self.store.get(&keys::performance(vendor_id)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .unwrap_or_else(|_| VendorPerformanceStats::empty(vendor_id)),
            Ok(None) => VendorPerformanceStats::empty(vendor_id),
            Err(error) => {
                tracing::warn!(vendor_id, error = %error, "performance read failed; reporting empty stats");
                VendorPerformanceStats::empty(vendor_id)
            }
        }
    }
}
