pub mod inventory;
pub mod orders;
pub mod products;
pub mod restock;

use crate::{
    db::DbPool,
    notifications::NotificationDispatcher,
    services::{
        inventory::InventoryService, order_number::OrderNumberGenerator, orders::OrderService,
        products::ProductService, restock::RestockService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub inventory: Arc<InventoryService>,
    pub restock: Arc<RestockService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifications: NotificationDispatcher,
        order_numbers: Arc<dyn OrderNumberGenerator>,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                notifications.clone(),
                order_numbers,
            )),
            products: Arc::new(ProductService::new(db_pool.clone())),
            inventory: Arc::new(InventoryService::new(db_pool.clone())),
            restock: Arc::new(RestockService::new(db_pool, notifications)),
        }
    }
}
