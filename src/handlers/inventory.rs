use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::inventory::{AdjustInventoryRequest, StockAdjustment},
    ApiResponse, AppState,
};

/// Manual stock correction for a product
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{product_id}/adjust",
    summary = "Adjust stock",
    description = "Adds (MANUAL_ADD, RETURNED) or removes (MANUAL_REMOVE, DAMAGED) stock and writes an inventory log row.",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<StockAdjustment>),
        (status = 400, description = "Invalid adjustment or not enough stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stock changed concurrently, retry", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AdjustInventoryRequest>,
) -> Result<Json<ApiResponse<StockAdjustment>>, ServiceError> {
    let actor = auth_user.actor()?;
    let adjustment = state
        .services
        .inventory
        .adjust(&actor, product_id, request)
        .await?;
    Ok(Json(ApiResponse::success(adjustment)))
}
