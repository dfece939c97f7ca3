use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{OrderSubmissionResponse, SubmitOrderRequest};
use crate::AppState;

/// Fixed success message returned with every processed submission. The
/// response stays success-shaped even when individual items fail; callers
/// compare `order_numbers` against the submitted item count (or read the
/// per-item report) to detect partial failure.
pub const SUBMIT_MESSAGE: &str = "Order processed successfully";

/// POST /api/v1/orders
///
/// Decodes a submission and runs the write pipeline. Only a structurally
/// invalid request produces an error-shaped response.
pub async fn submit_order(
    State(state): State<AppState>,
    payload: Result<Json<SubmitOrderRequest>, JsonRejection>,
) -> Result<Json<OrderSubmissionResponse>, ServiceError> {
    let Json(request) = payload
        .map_err(|e| ServiceError::BadRequest(format!("order payload is required: {}", e)))?;

    request.validate()?;

    let outcome = state.services.intake.process_order(&request).await;

    let items = if state.config.intake.compat_plain_response {
        None
    } else {
        Some(outcome.items)
    };

    Ok(Json(OrderSubmissionResponse {
        message: SUBMIT_MESSAGE.to_string(),
        order_numbers: outcome.order_numbers,
        items,
    }))
}
