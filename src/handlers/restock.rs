use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::restock_request,
    errors::ServiceError,
    services::restock::{CompleteRestockRequest, CreateRestockRequest},
    ApiResponse, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/restock",
    summary = "Request restock",
    description = "Raises a supplier restock request for a product and queues the supplier email. \
                   The quantity defaults to the shortfall against the product's threshold.",
    request_body = CreateRestockRequest,
    responses(
        (status = 201, description = "Restock request created", body = ApiResponse<restock_request::Model>),
        (status = 400, description = "Invalid request or product has no supplier email", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "An open request already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Restock"
)]
pub async fn create_restock_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateRestockRequest>,
) -> Result<(StatusCode, Json<ApiResponse<restock_request::Model>>), ServiceError> {
    let actor = auth_user.actor()?;
    let created = state.services.restock.create_manual(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/restock/{id}",
    summary = "Get restock request",
    params(("id" = Uuid, Path, description = "Restock request ID")),
    responses(
        (status = 200, description = "Restock request retrieved", body = ApiResponse<restock_request::Model>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Restock request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Restock"
)]
pub async fn get_restock_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<restock_request::Model>>, ServiceError> {
    let actor = auth_user.actor()?;
    let request = state.services.restock.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/restock/{id}/send-email",
    summary = "Resend supplier email",
    params(("id" = Uuid, Path, description = "Restock request ID")),
    responses(
        (status = 200, description = "Email queued", body = ApiResponse<restock_request::Model>),
        (status = 400, description = "Request already restocked", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Restock request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Restock"
)]
pub async fn resend_supplier_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<restock_request::Model>>, ServiceError> {
    let actor = auth_user.actor()?;
    let request = state.services.restock.resend_email(&actor, id).await?;
    Ok(Json(ApiResponse::with_message(
        request,
        "Supplier email queued",
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/restock/{id}/complete",
    summary = "Complete restock",
    description = "Records the units received, adds them to stock and closes the request.",
    params(("id" = Uuid, Path, description = "Restock request ID")),
    request_body = CompleteRestockRequest,
    responses(
        (status = 200, description = "Restock completed", body = ApiResponse<restock_request::Model>),
        (status = 400, description = "Request is not open", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin or manager role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Restock request not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Restock"
)]
pub async fn complete_restock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    body: Option<Json<CompleteRestockRequest>>,
) -> Result<Json<ApiResponse<restock_request::Model>>, ServiceError> {
    let actor = auth_user.actor()?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let completed = state.services.restock.complete(&actor, id, request).await?;
    Ok(Json(ApiResponse::success(completed)))
}
