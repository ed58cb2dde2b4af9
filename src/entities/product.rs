use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Product entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique across the catalog
    #[sea_orm(unique)]
    pub sku: String,

    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,

    pub cost_price: Decimal,

    /// Unit price charged to customers and snapshotted onto order items
    pub selling_price: Decimal,

    /// Units on hand, never negative
    pub stock_quantity: i32,

    /// Restock is requested once stock falls below this level
    pub min_threshold: i32,

    pub unit: String,
    pub supplier_name: Option<String>,
    pub supplier_email: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_below_threshold(&self) -> bool {
        self.stock_quantity < self.min_threshold
    }

    /// Supplier address when one is on file and not blank
    pub fn supplier_contact(&self) -> Option<&str> {
        self.supplier_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_log::Entity")]
    InventoryLogs,
    #[sea_orm(has_many = "super::restock_request::Entity")]
    RestockRequests,
}

impl Related<super::inventory_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLogs.def()
    }
}

impl Related<super::restock_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RestockRequests.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
