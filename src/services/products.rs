use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_log::ChangeType,
        product::{self, Entity as Product},
    },
    errors::ServiceError,
    services::{
        inventory::{apply_stock_movement, StockMovement},
        Actor,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const DEFAULT_UNIT: &str = "pcs";

/// Largest price a `decimal(12, 2)` column holds
const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn valid_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if *value > MAX_PRICE {
        let mut err = ValidationError::new("max_price");
        err.message = Some(format!("Price cannot exceed {}", MAX_PRICE).into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "SKU must be between 1 and 100 characters"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Product name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    #[validate(custom = "valid_price")]
    pub cost_price: Decimal,
    #[validate(custom = "valid_price")]
    pub selling_price: Decimal,
    /// Opening stock, logged as a MANUAL_ADD movement
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Threshold cannot be negative"))]
    pub min_threshold: i32,
    pub unit: Option<String>,
    pub supplier_name: Option<String>,
    #[validate(email(message = "Supplier email is not a valid address"))]
    pub supplier_email: Option<String>,
}

/// Descriptive, pricing and supplier changes. Stock is only moved through
/// inventory adjustments, orders and restocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "valid_price")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "valid_price")]
    pub selling_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_threshold: Option<i32>,
    pub unit: Option<String>,
    pub supplier_name: Option<String>,
    #[validate(email)]
    pub supplier_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetProductActiveRequest {
    pub is_active: bool,
}

/// Product catalog maintenance
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id, sku = %request.sku))]
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        actor.require_staff()?;
        let request = CreateProductRequest {
            sku: request.sku.trim().to_string(),
            name: request.name.trim().to_string(),
            ..request
        };
        request.validate()?;

        let created_by = actor.user_id;
        let product = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let taken = Product::find()
                    .filter(product::Column::Sku.eq(request.sku.as_str()))
                    .count(txn)
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Product with SKU '{}' already exists",
                        request.sku
                    )));
                }

                let now = Utc::now();
                let product = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sku: Set(request.sku.clone()),
                    name: Set(request.name.clone()),
                    description: Set(request.description),
                    category: Set(request.category),
                    cost_price: Set(request.cost_price),
                    selling_price: Set(request.selling_price),
                    stock_quantity: Set(0),
                    min_threshold: Set(request.min_threshold),
                    unit: Set(request.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string())),
                    supplier_name: Set(request.supplier_name),
                    supplier_email: Set(request.supplier_email),
                    is_active: Set(true),
                    created_by: Set(Some(created_by)),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await
                .map_err(|e| sku_conflict_or(e, &request.sku))?;

                if request.stock_quantity == 0 {
                    return Ok(product);
                }

                let log = apply_stock_movement(
                    txn,
                    &product,
                    StockMovement {
                        delta: request.stock_quantity,
                        change_type: ChangeType::ManualAdd,
                        performed_by: created_by,
                        order_id: None,
                        notes: Some("Opening stock".to_string()),
                    },
                )
                .await?;

                Ok(product::Model {
                    stock_quantity: log.new_stock,
                    updated_at: log.created_at,
                    ..product
                })
            })
        })
        .await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn update(
        &self,
        actor: &Actor,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        actor.require_staff()?;
        let request = UpdateProductRequest {
            name: request.name.map(|name| name.trim().to_string()),
            ..request
        };
        request.validate()?;

        let product = self.get(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(cost_price) = request.cost_price {
            active.cost_price = Set(cost_price);
        }
        if let Some(selling_price) = request.selling_price {
            active.selling_price = Set(selling_price);
        }
        if let Some(min_threshold) = request.min_threshold {
            active.min_threshold = Set(min_threshold);
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }
        if let Some(supplier_name) = request.supplier_name {
            active.supplier_name = Set(Some(supplier_name));
        }
        if let Some(supplier_email) = request.supplier_email {
            active.supplier_email = Set(Some(supplier_email));
        }

        let updated = active.update(self.db_pool.as_ref()).await?;
        info!(product_id = %updated.id, "Product updated");
        Ok(updated)
    }

    /// Soft activation toggle; inactive products cannot be ordered
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn set_active(
        &self,
        actor: &Actor,
        product_id: Uuid,
        is_active: bool,
    ) -> Result<product::Model, ServiceError> {
        actor.require_staff()?;

        let product = self.get(product_id).await?;
        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(is_active);

        let updated = active.update(self.db_pool.as_ref()).await?;
        info!(product_id = %updated.id, is_active, "Product activation changed");
        Ok(updated)
    }

    /// Hard delete, admins only
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, product_id: Uuid) -> Result<(), ServiceError> {
        actor.require_admin()?;

        let result = Product::delete_by_id(product_id)
            .exec(self.db_pool.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        info!(%product_id, "Product deleted");
        Ok(())
    }

    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}

fn sku_conflict_or(err: DbErr, sku: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict(format!("Product with SKU '{}' already exists", sku))
        }
        _ => ServiceError::db_error(err),
    }
}
