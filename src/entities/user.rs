use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role. Stored and carried in tokens as the lowercase name.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "customer")]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Customer => "customer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "users")]
#[schema(as = User)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub role: Role,
    pub shop_name: Option<String>,
    pub shop_address: Option<String>,
    pub shop_city: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Delivery address assembled from the shop fields, skipping blanks.
    pub fn shipping_address(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.shop_name, &self.shop_address, &self.shop_city]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn customer(name: Option<&str>, address: Option<&str>, city: Option<&str>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            role: Role::Customer,
            shop_name: name.map(Into::into),
            shop_address: address.map(Into::into),
            shop_city: city.map(Into::into),
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn shipping_address_joins_present_parts() {
        let c = customer(Some("Corner Store"), Some("12 Hill Rd"), Some("Pune"));
        assert_eq!(
            c.shipping_address().as_deref(),
            Some("Corner Store, 12 Hill Rd, Pune")
        );

        let partial = customer(None, Some("  "), Some("Pune"));
        assert_eq!(partial.shipping_address().as_deref(), Some("Pune"));

        assert!(customer(None, None, None).shipping_address().is_none());
    }

    #[test]
    fn role_round_trips_through_its_name() {
        for role in [Role::Admin, Role::Manager, Role::Customer] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
    }
}
