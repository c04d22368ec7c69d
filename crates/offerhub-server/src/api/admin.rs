use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use offerhub_core::{CircuitState, VendorPerformanceStats};

use crate::api::{ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// Per-vendor call telemetry plus the derived success rate, rounded to two
/// decimals for display.
#[derive(Debug, Serialize)]
pub(super) struct VendorPerformanceEntry {
    #[serde(flatten)]
    stats: VendorPerformanceStats,
    success_rate_percent: f64,
}

pub(super) async fn vendor_performance(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<BTreeMap<String, VendorPerformanceEntry>>> {
    let data = state
        .service
        .performance_snapshot()
        .await
        .into_iter()
        .map(|(vendor_id, stats)| {
            let success_rate_percent = round_2dp(stats.success_rate_percent());
            (
                vendor_id,
                VendorPerformanceEntry {
                    stats,
                    success_rate_percent,
                },
            )
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn circuit_states(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<BTreeMap<String, CircuitState>>> {
    let data = state.service.circuit_snapshot().await.into_iter().collect();
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn popular_skus(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<BTreeMap<String, u64>>> {
    let data = state.service.popular_skus().await.into_iter().collect();
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
