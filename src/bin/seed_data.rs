//! Seed data script - populates the database with demo users and products
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates (skipping anything that already exists):
//! - an admin, a manager and two customer shops
//! - a small grocery catalog with opening stock and supplier contacts
//!
//! and prints a development bearer token for every seeded user.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use bizops_api::{
    auth::{AuthConfig, AuthService},
    entities::{
        product,
        user::{self, Role},
        Product, User,
    },
    services::{
        products::{CreateProductRequest, ProductService},
        Actor,
    },
};

struct SeedUser {
    name: &'static str,
    email: &'static str,
    role: Role,
    shop: Option<(&'static str, &'static str, &'static str)>,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        name: "Olivia Admin",
        email: "admin@bizops.local",
        role: Role::Admin,
        shop: None,
    },
    SeedUser {
        name: "Marcus Manager",
        email: "manager@bizops.local",
        role: Role::Manager,
        shop: None,
    },
    SeedUser {
        name: "Priya Shah",
        email: "priya@cornerstore.local",
        role: Role::Customer,
        shop: Some(("Corner Store", "12 Market Street", "Pune")),
    },
    SeedUser {
        name: "Tomas Reyes",
        email: "tomas@freshmart.local",
        role: Role::Customer,
        shop: Some(("FreshMart", "4 Harbour Road", "Kochi")),
    },
];

/// (sku, name, category, cost, price, stock, threshold, supplier, supplier email)
type SeedProduct = (
    &'static str,
    &'static str,
    &'static str,
    Decimal,
    Decimal,
    i32,
    i32,
    &'static str,
    &'static str,
);

fn catalog() -> Vec<SeedProduct> {
    vec![
        ("FLR-001", "Wheat Flour 10kg", "Staples", dec!(6.50), dec!(9.25), 40, 10, "Golden Mills", "orders@goldenmills.local"),
        ("RCE-002", "Basmati Rice 5kg", "Staples", dec!(7.75), dec!(11.50), 25, 8, "Golden Mills", "orders@goldenmills.local"),
        ("OIL-003", "Sunflower Oil 1L", "Oils", dec!(1.25), dec!(2.50), 60, 15, "Sunny Oils", "sales@sunnyoils.local"),
        ("SGR-004", "Sugar 1kg", "Staples", dec!(0.75), dec!(1.25), 5, 10, "Sweet Co", "supply@sweetco.local"),
        ("TEA-005", "Assam Tea 250g", "Beverages", dec!(2.25), dec!(3.75), 30, 6, "Hill Estates", "trade@hillestates.local"),
        ("SOP-006", "Laundry Soap Bar", "Household", dec!(0.50), dec!(0.875), 120, 25, "CleanWorks", "b2b@cleanworks.local"),
    ]
}

async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<Vec<user::Model>> {
    let mut users = Vec::with_capacity(USERS.len());
    for seed in USERS {
        if let Some(existing) = User::find()
            .filter(user::Column::Email.eq(seed.email))
            .one(db)
            .await?
        {
            info!(email = seed.email, "  user exists, skipping");
            users.push(existing);
            continue;
        }

        let now = Utc::now();
        let (shop_name, shop_address, shop_city) = match seed.shop {
            Some((name, address, city)) => (
                Some(name.to_string()),
                Some(address.to_string()),
                Some(city.to_string()),
            ),
            None => (None, None, None),
        };
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(seed.name.to_string()),
            email: Set(seed.email.to_string()),
            role: Set(seed.role),
            shop_name: Set(shop_name),
            shop_address: Set(shop_address),
            shop_city: Set(shop_city),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(email = seed.email, role = %seed.role, "  created user");
        users.push(created);
    }
    Ok(users)
}

async fn seed_products(
    db: Arc<DatabaseConnection>,
    admin: &user::Model,
) -> anyhow::Result<usize> {
    let service = ProductService::new(db.clone());
    let actor = Actor::new(admin.id, admin.role);
    let mut created = 0;

    for (sku, name, category, cost, price, stock, threshold, supplier, email) in catalog() {
        let exists = Product::find()
            .filter(product::Column::Sku.eq(sku))
            .one(db.as_ref())
            .await?
            .is_some();
        if exists {
            info!(sku, "  product exists, skipping");
            continue;
        }

        service
            .create(
                &actor,
                CreateProductRequest {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    description: None,
                    category: Some(category.to_string()),
                    cost_price: cost,
                    selling_price: price,
                    stock_quantity: stock,
                    min_threshold: threshold,
                    unit: None,
                    supplier_name: Some(supplier.to_string()),
                    supplier_email: Some(email.to_string()),
                },
            )
            .await?;
        created += 1;
    }
    Ok(created)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = bizops_api::config::load_config()?;
    bizops_api::config::init_tracing(cfg.log_level(), false);

    info!("=== BizOps API Seed Data ===");

    let db = bizops_api::db::establish_connection_from_app_config(&cfg).await?;
    bizops_api::db::run_migrations(&db).await?;
    let db = Arc::new(db);

    info!("Creating users...");
    let users = seed_users(db.as_ref()).await?;

    let admin = users
        .iter()
        .find(|u| u.role == Role::Admin)
        .ok_or_else(|| anyhow::anyhow!("seed set has no admin"))?;

    info!("Creating products...");
    let created = seed_products(db.clone(), admin).await?;
    info!("  Created {} products", created);

    let mut auth_config = AuthConfig::from(&cfg);
    auth_config.token_ttl = chrono::Duration::days(7);
    let auth = AuthService::new(auth_config);

    println!("\nDevelopment tokens (valid 7 days):");
    for user in &users {
        let token = auth.generate_token(
            user.id,
            Some(user.name.clone()),
            Some(user.email.clone()),
            &[user.role],
        )?;
        println!("  {:<9} {:<26} {}", user.role.as_str(), user.email, token);
    }

    info!("Seed complete");
    Ok(())
}
