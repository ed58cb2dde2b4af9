use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_log::ChangeType,
        order::{self, Entity as Order, OrderStatus},
        order_item::{self, Entity as OrderItem},
        product::Entity as Product,
        restock_request,
        user::{self, Entity as User},
    },
    errors::ServiceError,
    notifications::{NotificationDispatcher, NotificationJob},
    services::{
        inventory::{apply_stock_movement, StockMovement},
        order_number::OrderNumberGenerator,
        restock::{open_request_exists, raise_request, supplier_job, ReorderStrategy},
        Actor,
    },
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    /// Processed in the order given
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<PlaceOrderItem>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl PlaceOrderRequest {
    fn validate_items(&self) -> Result<(), ServiceError> {
        self.validate()?;
        for (line, item) in self.items.iter().enumerate() {
            item.validate().map_err(|e| {
                ServiceError::ValidationError(format!("Item {}: {}", line + 1, e))
            })?;
        }
        Ok(())
    }
}

/// Prices one line and adds it to the running total. Overflow is reported
/// instead of panicking.
fn add_line(
    total: &mut Decimal,
    price: Decimal,
    quantity: i32,
    sku: &str,
) -> Result<Decimal, ServiceError> {
    let overflow = || {
        ServiceError::ValidationError(format!("Order amount for product {} is too large", sku))
    };
    let line_total = price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(overflow)?;
    *total = total.checked_add(line_total).ok_or_else(overflow)?;
    Ok(line_total)
}

/// An order together with its lines in submission order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Outcome of a successful placement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub details: OrderDetails,
    /// Restock requests raised because this order took stock below threshold
    pub restock_requests: Vec<restock_request::Model>,
}

/// Order placement and fulfilment
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    notifications: NotificationDispatcher,
    order_numbers: Arc<dyn OrderNumberGenerator>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifications: NotificationDispatcher,
        order_numbers: Arc<dyn OrderNumberGenerator>,
    ) -> Self {
        Self {
            db_pool,
            notifications,
            order_numbers,
        }
    }

    /// Places an order for the calling customer.
    ///
    /// Every line is checked, priced, taken out of stock and logged inside a
    /// single transaction; products that drop below their threshold get a
    /// restock request. Either all of it commits or none of it does. Emails
    /// are queued only after the commit.
    #[instrument(skip(self, request), fields(customer_id = %actor.user_id, items = request.items.len()))]
    pub async fn place_order(
        &self,
        actor: &Actor,
        request: PlaceOrderRequest,
    ) -> Result<PlacedOrder, ServiceError> {
        actor.require_customer()?;
        request.validate_items()?;

        let customer_id = actor.user_id;
        let order_number = self.order_numbers.next();

        let (placed, customer) = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let customer = User::find_by_id(customer_id)
                    .filter(user::Column::IsActive.eq(true))
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Customer {} not found", customer_id))
                    })?;

                let order_id = Uuid::new_v4();
                let mut total_amount = Decimal::ZERO;
                let mut items = Vec::with_capacity(request.items.len());
                let mut restock_requests = Vec::new();

                for (line_number, line) in request.items.iter().enumerate() {
                    let product = Product::find_by_id(line.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                line.product_id
                            ))
                        })?;

                    if !product.is_active {
                        return Err(ServiceError::InvalidState(format!(
                            "Product {} is not available for ordering",
                            product.sku
                        )));
                    }

                    if product.stock_quantity < line.quantity {
                        return Err(ServiceError::InsufficientStock(format!(
                            "product {} has {} units, {} requested",
                            product.sku, product.stock_quantity, line.quantity
                        )));
                    }

                    let price = product.selling_price;
                    let line_total =
                        add_line(&mut total_amount, price, line.quantity, &product.sku)?;

                    let log = apply_stock_movement(
                        txn,
                        &product,
                        StockMovement {
                            delta: -line.quantity,
                            change_type: ChangeType::Order,
                            performed_by: customer_id,
                            order_id: Some(order_id),
                            notes: Some(format!("Order {}", order_number)),
                        },
                    )
                    .await?;

                    let mut product = product;
                    product.stock_quantity = log.new_stock;

                    if product.is_below_threshold()
                        && product.supplier_contact().is_some()
                        && !open_request_exists(txn, product.id).await?
                    {
                        let quantity = ReorderStrategy::DoubleThreshold
                            .quantity(product.stock_quantity, product.min_threshold);
                        if let Some(created) = raise_request(
                            txn,
                            &product,
                            quantity,
                            customer_id,
                            Some(format!("Raised by order {}", order_number)),
                        )
                        .await?
                        {
                            restock_requests.push(created);
                        }
                    }

                    items.push(order_item::Model {
                        id: Uuid::new_v4(),
                        order_id,
                        line_number: line_number as i32,
                        product_id: product.id,
                        product_name: product.name.clone(),
                        sku: product.sku.clone(),
                        quantity: line.quantity,
                        price,
                        total: line_total,
                    });
                }

                let now = Utc::now();
                let order = order::ActiveModel {
                    id: Set(order_id),
                    order_number: Set(order_number),
                    customer_id: Set(customer_id),
                    total_amount: Set(total_amount),
                    status: Set(OrderStatus::Placed),
                    placed_at: Set(now),
                    dispatched_at: Set(None),
                    dispatched_by: Set(None),
                    delivered_at: Set(None),
                    confirmed_by_customer: Set(false),
                    notes: Set(request.notes),
                    shipping_address: Set(customer.shipping_address()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                OrderItem::insert_many(
                    items
                        .iter()
                        .cloned()
                        .map(|item| item.into_active_model().reset_all()),
                )
                .exec_without_returning(txn)
                .await?;

                Ok((
                    PlacedOrder {
                        details: OrderDetails { order, items },
                        restock_requests,
                    },
                    customer,
                ))
            })
        })
        .await?;

        let order = &placed.details.order;
        counter!("bizops.orders.placed", 1);
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            restock_requests = placed.restock_requests.len(),
            "Order placed"
        );

        self.notifications.dispatch(NotificationJob::OrderPlaced {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_name: customer.name,
            customer_email: customer.email,
            total_amount: order.total_amount,
            item_count: placed.details.items.len(),
        });
        for restock in &placed.restock_requests {
            counter!("bizops.restock.created", 1, "trigger" => "order");
            self.notifications.dispatch(supplier_job(restock));
        }

        Ok(placed)
    }

    /// Marks a PLACED order as DISPATCHED and tells the customer
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn dispatch_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        actor.require_staff()?;

        let db = self.db_pool.as_ref();
        let order = self.find_order(order_id).await?;
        if order.status != OrderStatus::Placed {
            return Err(ServiceError::InvalidState(format!(
                "Order {} is {}, only PLACED orders can be dispatched",
                order.order_number, order.status
            )));
        }

        let now = Utc::now();
        let result = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Dispatched))
            .col_expr(order::Column::DispatchedAt, Expr::value(now))
            .col_expr(order::Column::DispatchedBy, Expr::value(actor.user_id))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Placed))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        let order = order::Model {
            status: OrderStatus::Dispatched,
            dispatched_at: Some(now),
            dispatched_by: Some(actor.user_id),
            updated_at: now,
            ..order
        };
        info!(order_id = %order.id, "Order dispatched");

        if let Some(customer) = User::find_by_id(order.customer_id).one(db).await? {
            self.notifications.dispatch(NotificationJob::OrderDispatched {
                order_id: order.id,
                order_number: order.order_number.clone(),
                customer_name: customer.name,
                customer_email: customer.email,
            });
        }

        Ok(order)
    }

    /// Customer confirms a DISPATCHED order arrived
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn deliver_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.find_order(order_id).await?;

        if order.customer_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the customer who placed the order can confirm delivery".to_string(),
            ));
        }

        if order.status != OrderStatus::Dispatched {
            return Err(ServiceError::InvalidState(format!(
                "Order {} is {}, only DISPATCHED orders can be delivered",
                order.order_number, order.status
            )));
        }

        let now = Utc::now();
        let result = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Delivered))
            .col_expr(order::Column::DeliveredAt, Expr::value(now))
            .col_expr(order::Column::ConfirmedByCustomer, Expr::value(true))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Dispatched))
            .exec(self.db_pool.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        info!(order_id = %order.id, "Order delivered");
        Ok(order::Model {
            status: OrderStatus::Delivered,
            delivered_at: Some(now),
            confirmed_by_customer: true,
            updated_at: now,
            ..order
        })
    }

    /// Fetches an order with its lines; customers only see their own
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order = self.find_order(order_id).await?;

        if !actor.is_staff() && order.customer_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Customers may only view their own orders".to_string(),
            ));
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::LineNumber)
            .all(self.db_pool.as_ref())
            .await?;

        Ok(OrderDetails { order, items })
    }

    async fn find_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(order_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn lines_accumulate_into_the_total() {
        let mut total = Decimal::ZERO;
        assert_eq!(add_line(&mut total, dec!(2.50), 3, "FLR-1").unwrap(), dec!(7.50));
        assert_eq!(add_line(&mut total, dec!(0.99), 2, "TEA-1").unwrap(), dec!(1.98));
        assert_eq!(total, dec!(9.48));
    }

    #[test]
    fn amount_overflow_is_a_validation_error() {
        let mut total = Decimal::ZERO;
        assert_matches!(
            add_line(&mut total, Decimal::MAX, 2, "BIG-1"),
            Err(ServiceError::ValidationError(msg)) if msg.contains("BIG-1")
        );
        assert_eq!(total, Decimal::ZERO);

        let mut total = Decimal::MAX;
        assert_matches!(
            add_line(&mut total, dec!(1), 1, "BIG-2"),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(total, Decimal::MAX);
    }
}
