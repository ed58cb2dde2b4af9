use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reason for a stock movement.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    #[sea_orm(string_value = "ORDER")]
    Order,
    #[sea_orm(string_value = "RESTOCK")]
    Restock,
    #[sea_orm(string_value = "MANUAL_ADD")]
    ManualAdd,
    #[sea_orm(string_value = "MANUAL_REMOVE")]
    ManualRemove,
    #[sea_orm(string_value = "DAMAGED")]
    Damaged,
    #[sea_orm(string_value = "RETURNED")]
    Returned,
}

impl ChangeType {
    /// Sign applied to the quantity of a manual adjustment, `None` for types
    /// that only their own workflow may write.
    pub fn manual_direction(self) -> Option<i32> {
        match self {
            ChangeType::ManualAdd | ChangeType::Returned => Some(1),
            ChangeType::ManualRemove | ChangeType::Damaged => Some(-1),
            ChangeType::Order | ChangeType::Restock => None,
        }
    }
}

/// Append-only audit row; `new_stock - previous_stock == quantity_changed`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_logs")]
#[schema(as = InventoryLog)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub change_type: ChangeType,
    pub quantity_changed: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub performed_by: Uuid,
    pub order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
