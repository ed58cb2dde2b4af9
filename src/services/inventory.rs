use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_log::{self, ChangeType},
        product::{self, Entity as Product},
    },
    errors::ServiceError,
    services::Actor,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Manual stock correction
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustInventoryRequest {
    /// One of MANUAL_ADD, MANUAL_REMOVE, DAMAGED, RETURNED
    pub change_type: ChangeType,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustment {
    pub product: product::Model,
    pub log: inventory_log::Model,
}

/// One stock movement to apply against a product row that was just read.
pub(crate) struct StockMovement {
    pub delta: i32,
    pub change_type: ChangeType,
    pub performed_by: Uuid,
    pub order_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Moves stock by `movement.delta` and appends the matching audit row.
///
/// The update only matches while the row still holds the stock level that
/// was read, so a concurrent writer makes this fail with
/// `ConcurrentModification` instead of overwriting its change.
pub(crate) async fn apply_stock_movement<C>(
    conn: &C,
    product: &product::Model,
    movement: StockMovement,
) -> Result<inventory_log::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let previous = product.stock_quantity;
    let new_stock = previous.checked_add(movement.delta).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "Stock change of {} overflows stock for product {}",
            movement.delta, product.sku
        ))
    })?;

    if new_stock < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "product {} has {} units, {} requested",
            product.sku, previous, -movement.delta
        )));
    }

    let now = Utc::now();
    let result = Product::update_many()
        .col_expr(product::Column::StockQuantity, Expr::value(new_stock))
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(product.id))
        .filter(product::Column::StockQuantity.eq(previous))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(product.id));
    }

    let log = inventory_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        change_type: Set(movement.change_type),
        quantity_changed: Set(movement.delta),
        previous_stock: Set(previous),
        new_stock: Set(new_stock),
        performed_by: Set(movement.performed_by),
        order_id: Set(movement.order_id),
        notes: Set(movement.notes),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    Ok(log)
}

/// Service for manual inventory corrections
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a manual stock change and its audit row in one transaction
    #[instrument(skip(self, request), fields(actor = %actor.user_id, change_type = %request.change_type))]
    pub async fn adjust(
        &self,
        actor: &Actor,
        product_id: Uuid,
        request: AdjustInventoryRequest,
    ) -> Result<StockAdjustment, ServiceError> {
        actor.require_staff()?;
        request.validate()?;

        let direction = request.change_type.manual_direction().ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "{} changes are recorded by their own workflow",
                request.change_type
            ))
        })?;

        let performed_by = actor.user_id;
        let adjustment = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let product = Product::find_by_id(product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;

                let log = apply_stock_movement(
                    txn,
                    &product,
                    StockMovement {
                        delta: direction * request.quantity,
                        change_type: request.change_type,
                        performed_by,
                        order_id: None,
                        notes: request.notes,
                    },
                )
                .await?;

                let mut product = product;
                product.stock_quantity = log.new_stock;
                product.updated_at = log.created_at;
                Ok(StockAdjustment { product, log })
            })
        })
        .await?;

        info!(
            product_id = %product_id,
            previous_stock = adjustment.log.previous_stock,
            new_stock = adjustment.log.new_stock,
            "Inventory adjusted"
        );
        Ok(adjustment)
    }
}
