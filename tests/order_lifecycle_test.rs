mod common;

use assert_matches::assert_matches;
use bizops_api::{
    entities::OrderStatus,
    errors::ServiceError,
    notifications::NotificationJob,
    services::{
        orders::{PlaceOrderItem, PlaceOrderRequest, PlacedOrder},
        Actor,
    },
};
use common::TestApp;
use rust_decimal_macros::dec;

async fn placed_order(app: &TestApp, customer: &Actor) -> PlacedOrder {
    let manager = app.manager().await;
    let first = app
        .create_product(&manager, "FLR-100", dec!(2), 50, 0, None)
        .await;
    let second = app
        .create_product(&manager, "OIL-101", dec!(3), 50, 0, None)
        .await;

    app.services
        .orders
        .place_order(
            customer,
            PlaceOrderRequest {
                items: vec![
                    PlaceOrderItem {
                        product_id: second.id,
                        quantity: 1,
                    },
                    PlaceOrderItem {
                        product_id: first.id,
                        quantity: 2,
                    },
                ],
                notes: Some("Back door".into()),
            },
        )
        .await
        .expect("order placed")
}

#[tokio::test]
async fn order_moves_forward_through_fulfilment() {
    let mut app = TestApp::new().await;
    let customer = app.customer("Kim").await;
    let manager = app.manager().await;
    let placed = placed_order(&app, &customer).await;
    let order_id = placed.details.order.id;
    assert_eq!(placed.details.order.status, OrderStatus::Placed);
    app.drain_notifications();

    let dispatched = app
        .services
        .orders
        .dispatch_order(&manager, order_id)
        .await
        .unwrap();
    assert_eq!(dispatched.status, OrderStatus::Dispatched);
    assert_eq!(dispatched.dispatched_by, Some(manager.user_id));
    assert!(dispatched.dispatched_at.is_some());

    let jobs = app.drain_notifications();
    assert_eq!(jobs.len(), 1);
    assert_matches!(&jobs[0], NotificationJob::OrderDispatched { order_id: id, .. } if *id == order_id);

    let delivered = app
        .services
        .orders
        .deliver_order(&customer, order_id)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.confirmed_by_customer);
    assert!(delivered.delivered_at.is_some());

    let stored = app.order(order_id).await;
    assert_eq!(stored.status, OrderStatus::Delivered);
    assert!(stored.confirmed_by_customer);
    assert_eq!(stored.dispatched_by, Some(manager.user_id));
}

#[tokio::test]
async fn delivered_order_cannot_be_dispatched_again() {
    let app = TestApp::new().await;
    let customer = app.customer("Lea").await;
    let manager = app.manager().await;
    let order_id = placed_order(&app, &customer).await.details.order.id;

    app.services
        .orders
        .dispatch_order(&manager, order_id)
        .await
        .unwrap();
    app.services
        .orders
        .deliver_order(&customer, order_id)
        .await
        .unwrap();

    let result = app.services.orders.dispatch_order(&manager, order_id).await;
    assert_matches!(result, Err(ServiceError::InvalidState(_)));
    assert_eq!(app.order(order_id).await.status, OrderStatus::Delivered);

    let result = app.services.orders.deliver_order(&customer, order_id).await;
    assert_matches!(result, Err(ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn placed_order_cannot_skip_dispatch() {
    let app = TestApp::new().await;
    let customer = app.customer("Max").await;
    let order_id = placed_order(&app, &customer).await.details.order.id;

    let result = app.services.orders.deliver_order(&customer, order_id).await;
    assert_matches!(result, Err(ServiceError::InvalidState(_)));
    assert_eq!(app.order(order_id).await.status, OrderStatus::Placed);
}

#[tokio::test]
async fn only_the_owner_confirms_delivery() {
    let app = TestApp::new().await;
    let owner = app.customer("Nia").await;
    let stranger = app.customer("Oto").await;
    let manager = app.manager().await;
    let order_id = placed_order(&app, &owner).await.details.order.id;
    app.services
        .orders
        .dispatch_order(&manager, order_id)
        .await
        .unwrap();

    let result = app.services.orders.deliver_order(&stranger, order_id).await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    let result = app.services.orders.deliver_order(&manager, order_id).await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    let stored = app.order(order_id).await;
    assert_eq!(stored.status, OrderStatus::Dispatched);
    assert!(!stored.confirmed_by_customer);
}

#[tokio::test]
async fn customers_cannot_dispatch() {
    let app = TestApp::new().await;
    let customer = app.customer("Pia").await;
    let order_id = placed_order(&app, &customer).await.details.order.id;

    let result = app.services.orders.dispatch_order(&customer, order_id).await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
    assert_eq!(app.order(order_id).await.status, OrderStatus::Placed);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let manager = app.manager().await;
    let customer = app.customer("Quin").await;
    let missing = uuid::Uuid::new_v4();

    assert_matches!(
        app.services.orders.dispatch_order(&manager, missing).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.services.orders.deliver_order(&customer, missing).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.services.orders.get_order(&manager, missing).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn order_visibility_follows_ownership() {
    let app = TestApp::new().await;
    let owner = app.customer("Rui").await;
    let stranger = app.customer("Sol").await;
    let admin = app.admin().await;
    let placed = placed_order(&app, &owner).await;
    let order_id = placed.details.order.id;

    let own = app.services.orders.get_order(&owner, order_id).await.unwrap();
    assert_eq!(own.order.notes.as_deref(), Some("Back door"));
    let skus: Vec<&str> = own.items.iter().map(|item| item.sku.as_str()).collect();
    assert_eq!(skus, vec!["OIL-101", "FLR-100"]);
    assert_eq!(own.order.total_amount, dec!(7));

    let staff_view = app.services.orders.get_order(&admin, order_id).await.unwrap();
    assert_eq!(staff_view.items.len(), 2);

    assert_matches!(
        app.services.orders.get_order(&stranger, order_id).await,
        Err(ServiceError::Forbidden(_))
    );
}
