pub mod inventory_log;
pub mod order;
pub mod order_item;
pub mod product;
pub mod restock_request;
pub mod user;

pub use inventory_log::{ChangeType, Entity as InventoryLog};
pub use order::{Entity as Order, OrderStatus};
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use restock_request::{Entity as RestockRequest, RestockStatus};
pub use user::{Entity as User, Role};
