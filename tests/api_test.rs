mod common;

use axum::http::{Method, StatusCode};
use bizops_api::middleware_helpers::REQUEST_ID_HEADER;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_and_status_need_no_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "bizops-api");
    assert_eq!(body["data"]["environment"], "test");

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["paths"]["/api/v1/orders"].is_object());
}

#[tokio::test]
async fn missing_or_forged_tokens_are_unauthorized() {
    let app = TestApp::new().await;
    let order_path = format!("/api/v1/orders/{}", uuid::Uuid::new_v4());

    let response = app.request(Method::GET, &order_path, None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["request_id"].is_string());

    let response = app
        .request(Method::GET, &order_path, None, Some("not.a.jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_errors_use_the_error_envelope() {
    let app = TestApp::new().await;
    let customer = app.customer("Xia").await;
    let token = app.token_for(&customer);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({"sku": "X-1", "name": "X", "selling_price": "1.00"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["request_id"], request_id.as_str());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn order_flow_over_http() {
    let app = TestApp::new().await;
    let manager = app.manager().await;
    let customer = app.customer("Yan").await;
    let manager_token = app.token_for(&manager);
    let customer_token = app.token_for(&customer);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "FLR-900",
                "name": "Wheat Flour 10kg",
                "selling_price": "2.50",
                "stock_quantity": 5,
                "min_threshold": 10,
                "supplier_email": "mill@supplier.example"
            })),
            Some(&manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["stock_quantity"], 5);
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"items": [{"product_id": product_id, "quantity": 3}]})),
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["order_number"], "ORD-000001");
    assert_eq!(body["data"]["status"], "PLACED");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["restock_requests"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["restock_requests"][0]["status"], "PENDING");
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"items": [{"product_id": product_id, "quantity": 10}]})),
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient stock"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            None,
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/deliver"),
            None,
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/dispatch"),
            None,
            Some(&manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["status"], "DISPATCHED");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/deliver"),
            None,
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "DELIVERED");
    assert_eq!(body["data"]["confirmed_by_customer"], true);
}

#[tokio::test]
async fn stock_and_restock_over_http() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let token = app.token_for(&admin);
    let product = app
        .create_product(&admin, "TEA-910", rust_decimal_macros::dec!(3), 2, 10, Some("tea@supplier.example"))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({"stock_quantity": 500})),
            Some(&token),
        )
        .await;
    assert!(response.status().is_client_error());
    assert_eq!(app.product(product.id).await.stock_quantity, 2);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory/{}/adjust", product.id),
            Some(json!({"change_type": "MANUAL_ADD", "quantity": 3, "notes": "Found a carton"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["stock_quantity"], 5);
    assert_eq!(body["data"]["log"]["quantity_changed"], 3);

    let response = app
        .request(
            Method::POST,
            "/api/v1/restock",
            Some(json!({"product_id": product.id, "requested_quantity": 15})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let restock_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/restock",
            Some(json!({"product_id": product.id})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/restock/{restock_id}/send-email"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["message"],
        "Supplier email queued"
    );

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/restock/{restock_id}/complete"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "RESTOCKED");
    assert_eq!(body["data"]["received_quantity"], 15);
    assert_eq!(app.product(product.id).await.stock_quantity, 20);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/restock/{restock_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{}", product.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
