use axum::{
    extract::{Path, State},
    Extension, Json,
};

use offerhub_core::SelectionResult;

use crate::api::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

const SKU_MIN_LEN: usize = 3;
const SKU_MAX_LEN: usize = 20;

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(sku): Path<String>,
) -> Result<Json<ApiResponse<SelectionResult>>, ApiError> {
    validate_sku(&sku)
        .map_err(|reason| ApiError::new(req_id.0.clone(), "validation_error", reason))?;

    let result = state.service.get_product(&sku).await;
    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn validate_sku(sku: &str) -> Result<(), String> {
    if sku.len() < SKU_MIN_LEN || sku.len() > SKU_MAX_LEN {
        return Err(format!(
            "sku must be {SKU_MIN_LEN} to {SKU_MAX_LEN} characters"
        ));
    }
    if !sku.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err("sku must contain only ASCII letters and digits".to_string());
    }
    Ok(())
}
