use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single vendor's answer for one SKU, reduced to the common model every
/// downstream component speaks.
///
/// Created per request per vendor and never persisted; only `valid` offers
/// with stock participate in selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOffer {
    pub sku: String,
    /// Roster id of the vendor this offer came from, e.g. `"vendor1"`.
    pub vendor_id: String,
    /// Units on hand. Zero both for "out of stock" and for anything the
    /// vendor reported that could not be read as a count.
    pub stock: u32,
    /// Unit price. Zero when the vendor's price field was absent or garbage,
    /// which also forces `valid` to false.
    pub price: Decimal,
    /// When the vendor says it last refreshed this record.
    pub observed_at: DateTime<Utc>,
    /// True iff `price > 0` and `observed_at` is within the freshness window.
    pub valid: bool,
}

/// Outcome bucket of a selection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    OutOfStock,
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvailabilityStatus::Available => write!(f, "available"),
            AvailabilityStatus::OutOfStock => write!(f, "out_of_stock"),
        }
    }
}

/// The answer to "best available price/stock for this SKU".
///
/// Cached under the product TTL; `cache_hit` is false at write time and is
/// flipped to true only when a later request reads it back from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub sku: String,
    pub best_vendor: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub status: AvailabilityStatus,
    /// How many vendors produced an offer for this run, valid or not.
    pub vendors_checked: usize,
    pub cache_hit: bool,
}

impl SelectionResult {
    /// An OUT_OF_STOCK result carrying no winner, used whenever no vendor
    /// offer survives filtering.
    #[must_use]
    pub fn out_of_stock(sku: &str, vendors_checked: usize) -> Self {
        SelectionResult {
            sku: sku.to_string(),
            best_vendor: None,
            price: None,
            stock: None,
            status: AvailabilityStatus::OutOfStock,
            vendors_checked,
            cache_hit: false,
        }
    }
}

/// Circuit breaker phase for one vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitPhase::Closed => write!(f, "closed"),
            CircuitPhase::Open => write!(f, "open"),
            CircuitPhase::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Failure-isolation state for one vendor, mutated by every call outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitState {
    pub vendor_id: String,
    pub state: CircuitPhase,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Earliest instant a probe may go through an open circuit. Never set
    /// while the circuit is closed.
    pub reopen_at: Option<DateTime<Utc>>,
}

impl CircuitState {
    /// The initial state every vendor starts from: closed, no failures.
    #[must_use]
    pub fn fresh(vendor_id: &str) -> Self {
        CircuitState {
            vendor_id: vendor_id.to_string(),
            state: CircuitPhase::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            reopen_at: None,
        }
    }
}

/// Rolling per-vendor call telemetry.
///
/// `successes + failures == total_calls` always holds; `avg_latency_ms` is
/// the running mean over all calls, failed ones included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPerformanceStats {
    pub vendor_id: String,
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub avg_latency_ms: f64,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl VendorPerformanceStats {
    /// Zeroed stats for a vendor that has not been called yet.
    #[must_use]
    pub fn empty(vendor_id: &str) -> Self {
        VendorPerformanceStats {
            vendor_id: vendor_id.to_string(),
            total_calls: 0,
            successes: 0,
            failures: 0,
            avg_latency_ms: 0.0,
            last_failure_at: None,
        }
    }

    /// Success percentage over all recorded calls, 0.0 when none were made.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate_percent(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.total_calls as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_status_serializes_snake_case() {
        let json = serde_json::to_string(&AvailabilityStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out_of_stock\"");
    }

    #[test]
    fn circuit_phase_round_trips() {
        for phase in [CircuitPhase::Closed, CircuitPhase::Open, CircuitPhase::HalfOpen] {
            let json = serde_json::to_string(&phase).unwrap();
            let back: CircuitPhase = serde_json::from_str(&json).unwrap();
            assert_eq!(back, phase);
        }
    }

    #[test]
    fn fresh_circuit_is_closed_with_no_timestamps() {
        let state = CircuitState::fresh("vendor1");
        assert_eq!(state.state, CircuitPhase::Closed);
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_failure_at.is_none());
        assert!(state.reopen_at.is_none());
    }

    #[test]
    fn success_rate_handles_zero_calls() {
        let stats = VendorPerformanceStats::empty("vendor2");
        assert!((stats.success_rate_percent() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn success_rate_percent_over_mixed_outcomes() {
        let stats = VendorPerformanceStats {
            vendor_id: "vendor1".to_string(),
            total_calls: 8,
            successes: 6,
            failures: 2,
            avg_latency_ms: 41.5,
            last_failure_at: None,
        };
        assert!((stats.success_rate_percent() - 75.0).abs() < f64::EPSILON);
    }
}
