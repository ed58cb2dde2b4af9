use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::order,
    errors::ServiceError,
    services::orders::{OrderDetails, PlaceOrderRequest, PlacedOrder},
    ApiResponse, AppState,
};

/// Place an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Place an order for the authenticated customer. Stock is taken, \
                   logged and, where it falls below threshold, a supplier restock \
                   request is raised, all in one transaction.",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<PlacedOrder>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request, inactive product or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not a customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stock changed concurrently, retry", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>), ServiceError> {
    let actor = auth_user.actor()?;
    let placed = state.services.orders.place_order(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(placed))))
}

/// Get an order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetails>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Order belongs to another customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderDetails>>, ServiceError> {
    let actor = auth_user.actor()?;
    let details = state.services.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Mark an order dispatched
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/dispatch",
    summary = "Dispatch order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order dispatched", body = ApiResponse<order::Model>),
        (status = 400, description = "Order is not PLACED", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn dispatch_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let actor = auth_user.actor()?;
    let order = state.services.orders.dispatch_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Confirm delivery of an order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/deliver",
    summary = "Confirm delivery",
    description = "Only the customer who placed the order may confirm it arrived.",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order delivered", body = ApiResponse<order::Model>),
        (status = 400, description = "Order is not DISPATCHED", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller did not place the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn deliver_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let actor = auth_user.actor()?;
    let order = state.services.orders.deliver_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}
