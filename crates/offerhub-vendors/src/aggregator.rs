use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use offerhub_core::{CircuitState, NormalizedOffer, VendorConfig};
use offerhub_store::PerformanceTracker;

use crate::circuit::CircuitBreaker;
use crate::error::VendorError;
use crate::normalize::{normalize, parse_payload};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::transport::VendorTransport;
use crate::types::VendorPayload;

/// Everything needed to ask one vendor about one SKU: transport, retry
/// policy, breaker, and the telemetry sink.
pub struct VendorPipeline {
    vendor: VendorConfig,
    transport: Arc<dyn VendorTransport>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    perf: PerformanceTracker,
}

impl VendorPipeline {
    #[must_use]
    pub fn new(
        vendor: VendorConfig,
        transport: Arc<dyn VendorTransport>,
        breaker: CircuitBreaker,
        retry: RetryPolicy,
        perf: PerformanceTracker,
    ) -> Self {
        VendorPipeline {
            vendor,
            transport,
            breaker,
            retry,
            perf,
        }
    }

    #[must_use]
    pub fn vendor_id(&self) -> &str {
        &self.vendor.id
    }

    /// Fetch and normalize this vendor's offer for `sku`, or `None` when the
    /// vendor could not produce one. Failures never surface to the caller;
    /// the vendor is absent from the offer set.
    pub async fn fetch_offer(
        &self,
        sku: &str,
        now: DateTime<Utc>,
        freshness_window: chrono::Duration,
    ) -> Option<NormalizedOffer> {
        let outcome = self
            .breaker
            .call(|| retry_with_backoff(self.retry, &self.vendor.id, || self.attempt(sku)))
            .await;

        match outcome {
            Ok(payload) => Some(normalize(&self.vendor.id, &payload, now, freshness_window)),
            Err(VendorError::CircuitOpen { .. }) => {
                tracing::debug!(
                    vendor_id = %self.vendor.id,
                    sku,
                    "circuit open; skipping vendor"
                );
                None
            }
            Err(error) => {
                tracing::warn!(
                    vendor_id = %self.vendor.id,
                    sku,
                    error = %error,
                    "vendor call failed; omitting from offer set"
                );
                None
            }
        }
    }

    /// One transport attempt: fetch the raw body and parse it into the
    /// vendor's schema. Each attempt lands one performance sample, so a call
    /// that retries twice records three.
    async fn attempt(&self, sku: &str) -> Result<VendorPayload, VendorError> {
        let started = Instant::now();
        let outcome = self.fetch_and_parse(sku).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.perf
            .record(&self.vendor.id, outcome.is_ok(), latency_ms, Utc::now())
            .await;
        outcome
    }

    async fn fetch_and_parse(&self, sku: &str) -> Result<VendorPayload, VendorError> {
        let body = self.transport.fetch(sku).await?;
        parse_payload(self.vendor.format, &body)
    }

    async fn circuit_state(&self) -> CircuitState {
        self.breaker.snapshot().await
    }
}

/// Concurrent fan-out across the whole roster. Every vendor call runs as its
/// own future; the aggregator waits for all of them to settle and collects
/// whatever offers came back.
pub struct FanOutAggregator {
    pipelines: Vec<VendorPipeline>,
    freshness_window: chrono::Duration,
}

impl FanOutAggregator {
    #[must_use]
    pub fn new(pipelines: Vec<VendorPipeline>, freshness_window: Duration) -> Self {
        FanOutAggregator {
            pipelines,
            freshness_window: chrono::Duration::from_std(freshness_window)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Ask every configured vendor about `sku` concurrently. An empty result
    /// is a valid outcome, not an error; it means no vendor answered usably.
    pub async fn fetch_all(&self, sku: &str) -> Vec<NormalizedOffer> {
        let now = Utc::now();
        let offers: Vec<NormalizedOffer> = join_all(
            self.pipelines
                .iter()
                .map(|pipeline| pipeline.fetch_offer(sku, now, self.freshness_window)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        tracing::debug!(
            sku,
            vendors = self.pipelines.len(),
            offers = offers.len(),
            "vendor fan-out settled"
        );
        offers
    }

    #[must_use]
    pub fn vendor_ids(&self) -> Vec<String> {
        self.pipelines
            .iter()
            .map(|pipeline| pipeline.vendor.id.clone())
            .collect()
    }

    /// Current breaker state per vendor, for the admin surface.
    pub async fn circuit_snapshot(&self) -> HashMap<String, CircuitState> {
        let states = join_all(
            self.pipelines
                .iter()
                .map(VendorPipeline::circuit_state),
        )
        .await;
        states
            .into_iter()
            .map(|state| (state.vendor_id.clone(), state))
            .collect()
    }
}
