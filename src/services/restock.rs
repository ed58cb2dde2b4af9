use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_log::ChangeType,
        product::{self, Entity as Product},
        restock_request::{self, Entity as RestockRequest, RestockStatus},
    },
    errors::ServiceError,
    notifications::{NotificationDispatcher, NotificationJob},
    services::{
        inventory::{apply_stock_movement, StockMovement},
        Actor,
    },
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// How many units to ask a supplier for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderStrategy {
    /// Refill to twice the threshold, never less than the threshold itself.
    /// Used when an order drags stock below the threshold.
    DoubleThreshold,
    /// Just enough to get back to the threshold, at least one unit.
    /// Default for requests raised by staff.
    ShortfallOnly,
}

impl ReorderStrategy {
    pub fn quantity(self, stock: i32, threshold: i32) -> i32 {
        match self {
            ReorderStrategy::DoubleThreshold => threshold
                .saturating_mul(2)
                .saturating_sub(stock)
                .max(threshold)
                .max(1),
            ReorderStrategy::ShortfallOnly => threshold.saturating_sub(stock).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRestockRequest {
    pub product_id: Uuid,
    /// Defaults to the shortfall against the product's threshold
    #[validate(range(min = 1, message = "Requested quantity must be at least 1"))]
    pub requested_quantity: Option<i32>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompleteRestockRequest {
    /// Units actually received, defaults to the requested quantity
    #[validate(range(min = 1, message = "Received quantity must be at least 1"))]
    pub received_quantity: Option<i32>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Supplier email for a restock request
pub fn supplier_job(request: &restock_request::Model) -> NotificationJob {
    NotificationJob::RestockRequested {
        restock_request_id: request.id,
        product_name: request.product_name.clone(),
        sku: request.sku.clone(),
        current_stock: request.current_stock,
        threshold: request.threshold,
        requested_quantity: request.requested_quantity,
        supplier_name: request.supplier_name.clone(),
        supplier_email: request.supplier_email.clone(),
    }
}

pub(crate) async fn open_request_exists<C>(conn: &C, product_id: Uuid) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let open = RestockRequest::find()
        .filter(restock_request::Column::ProductId.eq(product_id))
        .filter(restock_request::Column::Status.is_in(RestockStatus::OPEN))
        .count(conn)
        .await?;
    Ok(open > 0)
}

/// Inserts a PENDING request for `product` unless an open one exists.
///
/// Returns `None` when another writer got there first: the partial unique
/// index turns the insert into a no-op rather than an error.
pub(crate) async fn raise_request<C>(
    conn: &C,
    product: &product::Model,
    requested_quantity: i32,
    created_by: Uuid,
    notes: Option<String>,
) -> Result<Option<restock_request::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let supplier_email = product.supplier_contact().ok_or_else(|| {
        ServiceError::InvalidState(format!(
            "Product {} has no supplier email on file",
            product.sku
        ))
    })?;

    let now = Utc::now();
    let request = restock_request::Model {
        id: Uuid::new_v4(),
        product_id: product.id,
        product_name: product.name.clone(),
        sku: product.sku.clone(),
        current_stock: product.stock_quantity,
        threshold: product.min_threshold,
        requested_quantity,
        supplier_email: supplier_email.to_string(),
        supplier_name: product.supplier_name.clone(),
        status: RestockStatus::Pending,
        email_sent_at: None,
        restocked_at: None,
        restocked_by: None,
        received_quantity: None,
        notes,
        created_by,
        created_at: now,
        updated_at: now,
    };

    let inserted = RestockRequest::insert(request.clone().into_active_model().reset_all())
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .exec_without_returning(conn)
        .await;

    match inserted {
        Ok(rows) if rows > 0 => Ok(Some(request)),
        Ok(_) | Err(DbErr::RecordNotInserted) => {
            warn!(product_id = %product.id, "open restock request already exists, skipping");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Supplier restock workflow
#[derive(Clone)]
pub struct RestockService {
    db_pool: Arc<DbPool>,
    notifications: NotificationDispatcher,
}

impl RestockService {
    pub fn new(db_pool: Arc<DbPool>, notifications: NotificationDispatcher) -> Self {
        Self {
            db_pool,
            notifications,
        }
    }

    /// Records receipt of a restock: stock goes up, the request closes
    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn complete(
        &self,
        actor: &Actor,
        restock_request_id: Uuid,
        request: CompleteRestockRequest,
    ) -> Result<restock_request::Model, ServiceError> {
        actor.require_staff()?;
        request.validate()?;

        let restocked_by = actor.user_id;
        let completed = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let restock = RestockRequest::find_by_id(restock_request_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Restock request {} not found",
                            restock_request_id
                        ))
                    })?;

                if !restock.status.is_open() {
                    return Err(ServiceError::InvalidState(format!(
                        "Restock request {} is already {}",
                        restock.id, restock.status
                    )));
                }

                let product = Product::find_by_id(restock.product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product {} not found",
                            restock.product_id
                        ))
                    })?;

                let received = request
                    .received_quantity
                    .unwrap_or(restock.requested_quantity);

                apply_stock_movement(
                    txn,
                    &product,
                    StockMovement {
                        delta: received,
                        change_type: ChangeType::Restock,
                        performed_by: restocked_by,
                        order_id: None,
                        notes: Some(format!("Restock request {}", restock.id)),
                    },
                )
                .await?;

                let now = Utc::now();
                let notes = request.notes.or(restock.notes.clone());
                let result = RestockRequest::update_many()
                    .col_expr(
                        restock_request::Column::Status,
                        Expr::value(RestockStatus::Restocked),
                    )
                    .col_expr(restock_request::Column::RestockedAt, Expr::value(now))
                    .col_expr(
                        restock_request::Column::RestockedBy,
                        Expr::value(restocked_by),
                    )
                    .col_expr(
                        restock_request::Column::ReceivedQuantity,
                        Expr::value(received),
                    )
                    .col_expr(restock_request::Column::Notes, Expr::value(notes.clone()))
                    .col_expr(restock_request::Column::UpdatedAt, Expr::value(now))
                    .filter(restock_request::Column::Id.eq(restock.id))
                    .filter(restock_request::Column::Status.is_in(RestockStatus::OPEN))
                    .exec(txn)
                    .await?;

                if result.rows_affected == 0 {
                    return Err(ServiceError::ConcurrentModification(restock.id));
                }

                Ok(restock_request::Model {
                    status: RestockStatus::Restocked,
                    restocked_at: Some(now),
                    restocked_by: Some(restocked_by),
                    received_quantity: Some(received),
                    notes,
                    updated_at: now,
                    ..restock
                })
            })
        })
        .await?;

        info!(
            restock_request_id = %completed.id,
            product_id = %completed.product_id,
            received = ?completed.received_quantity,
            "Restock completed"
        );
        Ok(completed)
    }

    /// Raises a restock request by hand and emails the supplier
    #[instrument(skip(self, request), fields(actor = %actor.user_id, product_id = %request.product_id))]
    pub async fn create_manual(
        &self,
        actor: &Actor,
        request: CreateRestockRequest,
    ) -> Result<restock_request::Model, ServiceError> {
        actor.require_staff()?;
        request.validate()?;

        let created_by = actor.user_id;
        let created = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let product = Product::find_by_id(request.product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product {} not found",
                            request.product_id
                        ))
                    })?;

                if product.supplier_contact().is_none() {
                    return Err(ServiceError::InvalidState(format!(
                        "Product {} has no supplier email on file",
                        product.sku
                    )));
                }

                if open_request_exists(txn, product.id).await? {
                    return Err(ServiceError::Conflict(format!(
                        "An open restock request already exists for product {}",
                        product.sku
                    )));
                }

                let quantity = request.requested_quantity.unwrap_or_else(|| {
                    ReorderStrategy::ShortfallOnly
                        .quantity(product.stock_quantity, product.min_threshold)
                });

                raise_request(txn, &product, quantity, created_by, request.notes)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Conflict(format!(
                            "An open restock request already exists for product {}",
                            product.sku
                        ))
                    })
            })
        })
        .await?;

        counter!("bizops.restock.created", 1, "trigger" => "manual");
        info!(restock_request_id = %created.id, "Manual restock request created");
        self.notifications.dispatch(supplier_job(&created));
        Ok(created)
    }

    /// Queues the supplier email again for a request that is still open
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn resend_email(
        &self,
        actor: &Actor,
        restock_request_id: Uuid,
    ) -> Result<restock_request::Model, ServiceError> {
        let request = self.get(actor, restock_request_id).await?;

        if !request.status.is_open() {
            return Err(ServiceError::InvalidState(format!(
                "Restock request {} is already {}",
                request.id, request.status
            )));
        }

        self.notifications.dispatch(supplier_job(&request));
        Ok(request)
    }

    pub async fn get(
        &self,
        actor: &Actor,
        restock_request_id: Uuid,
    ) -> Result<restock_request::Model, ServiceError> {
        actor.require_staff()?;

        RestockRequest::find_by_id(restock_request_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Restock request {} not found",
                    restock_request_id
                ))
            })
    }
}
