use crate::{handlers, AppState};
use axum::{response::Json, routing::get, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BizOps API",
        version = "1.0.0",
        description = r#"
# BizOps API

Back office for a small wholesale business: product catalog, stock movements,
customer orders and supplier restocking.

## Authentication

Every endpoint except health and status expects a bearer JWT:

```
Authorization: Bearer <your-jwt-token>
```

Roles carried in the token decide what a caller may do: `admin`, `manager`
or `customer`.

## Error Handling

Failures share one body shape:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Insufficient stock: product FLR-001 has 5 units, 10 requested",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order placement and fulfilment"),
        (name = "Products", description = "Product catalog"),
        (name = "Inventory", description = "Manual stock corrections"),
        (name = "Restock", description = "Supplier restock requests")
    ),
    paths(
        // Orders
        handlers::orders::place_order,
        handlers::orders::get_order,
        handlers::orders::dispatch_order,
        handlers::orders::deliver_order,
        // Products
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::set_product_active,
        handlers::products::delete_product,
        // Inventory
        handlers::inventory::adjust_inventory,
        // Restock
        handlers::restock::create_restock_request,
        handlers::restock::get_restock_request,
        handlers::restock::resend_supplier_email,
        handlers::restock::complete_restock,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::OrderStatus,
            crate::entities::RestockStatus,
            crate::entities::ChangeType,
            crate::entities::Role,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
