#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use bizops_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        inventory_log, order, product,
        restock_request::{self, RestockStatus},
        user::{self, Role},
        InventoryLog, Order, Product, RestockRequest,
    },
    handlers::AppServices,
    notifications::{
        EmailMessage, Mailer, NotificationDispatcher, NotificationError, NotificationJob,
        NotificationWorker,
    },
    services::{
        order_number::SequentialOrderNumbers,
        products::CreateProductRequest,
        Actor,
    },
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-tests-signing-key-4f9a7c21e8b3";

/// Mailer that keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Mailer whose relay is unreachable
#[derive(Default)]
pub struct DownMailer {
    attempts: Mutex<u32>,
}

impl DownMailer {
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Mailer for DownMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotificationError> {
        *self.attempts.lock().unwrap() += 1;
        Err(NotificationError::Transport("connection refused".to_string()))
    }
}

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub state: AppState,
    pub auth: Arc<AuthService>,
    pub mailer: Arc<RecordingMailer>,
    pub worker: NotificationWorker,
    router: Router,
    notifications: mpsc::Receiver<NotificationJob>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let (dispatcher, notifications) = NotificationDispatcher::channel(256);
        let mailer = Arc::new(RecordingMailer::default());
        let worker = NotificationWorker::new(mailer.clone(), db.clone());

        let services = AppServices::new(
            db.clone(),
            dispatcher,
            Arc::new(SequentialOrderNumbers::new()),
        );
        let auth = Arc::new(AuthService::new(AuthConfig::new(TEST_JWT_SECRET)));
        let state = AppState::new(db.clone(), auth.clone(), services.clone(), "test");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.request_timeout_secs = 10;
        let router = bizops_api::build_router(state.clone(), &cfg);

        Self {
            db,
            services,
            state,
            auth,
            mailer,
            worker,
            router,
            notifications,
        }
    }

    pub async fn create_user(&self, role: Role, name: &str) -> user::Model {
        let now = Utc::now();
        let slug = name.to_ascii_lowercase().replace(' ', ".");
        let is_customer = role == Role::Customer;
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(format!("{}.{}@example.com", slug, &Uuid::new_v4().simple().to_string()[..8])),
            role: Set(role),
            shop_name: Set(is_customer.then(|| format!("{} Stores", name))),
            shop_address: Set(is_customer.then(|| "1 Main Road".to_string())),
            shop_city: Set(is_customer.then(|| "Springfield".to_string())),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert user")
    }

    pub async fn admin(&self) -> Actor {
        let user = self.create_user(Role::Admin, "Ada Admin").await;
        Actor::new(user.id, user.role)
    }

    pub async fn manager(&self) -> Actor {
        let user = self.create_user(Role::Manager, "Mo Manager").await;
        Actor::new(user.id, user.role)
    }

    pub async fn customer(&self, name: &str) -> Actor {
        let user = self.create_user(Role::Customer, name).await;
        Actor::new(user.id, user.role)
    }

    /// Creates an active product through the catalog service
    pub async fn create_product(
        &self,
        staff: &Actor,
        sku: &str,
        price: Decimal,
        stock: i32,
        threshold: i32,
        supplier_email: Option<&str>,
    ) -> product::Model {
        self.services
            .products
            .create(
                staff,
                CreateProductRequest {
                    sku: sku.to_string(),
                    name: format!("Product {}", sku),
                    description: None,
                    category: None,
                    cost_price: Decimal::ZERO,
                    selling_price: price,
                    stock_quantity: stock,
                    min_threshold: threshold,
                    unit: None,
                    supplier_name: supplier_email.map(|_| "Acme Supply".to_string()),
                    supplier_email: supplier_email.map(str::to_string),
                },
            )
            .await
            .expect("create product")
    }

    pub async fn product(&self, id: Uuid) -> product::Model {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("load product")
            .expect("product exists")
    }

    pub async fn logs_for(&self, product_id: Uuid) -> Vec<inventory_log::Model> {
        InventoryLog::find()
            .filter(inventory_log::Column::ProductId.eq(product_id))
            .order_by_asc(inventory_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .expect("load inventory logs")
    }

    pub async fn logs_of_type(
        &self,
        product_id: Uuid,
        change_type: inventory_log::ChangeType,
    ) -> Vec<inventory_log::Model> {
        InventoryLog::find()
            .filter(inventory_log::Column::ProductId.eq(product_id))
            .filter(inventory_log::Column::ChangeType.eq(change_type))
            .all(self.db.as_ref())
            .await
            .expect("load inventory logs")
    }

    pub async fn restock_requests_for(&self, product_id: Uuid) -> Vec<restock_request::Model> {
        RestockRequest::find()
            .filter(restock_request::Column::ProductId.eq(product_id))
            .order_by_asc(restock_request::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .expect("load restock requests")
    }

    pub async fn open_restock_count(&self, product_id: Uuid) -> u64 {
        RestockRequest::find()
            .filter(restock_request::Column::ProductId.eq(product_id))
            .filter(restock_request::Column::Status.is_in(RestockStatus::OPEN))
            .count(self.db.as_ref())
            .await
            .expect("count restock requests")
    }

    pub async fn order_count(&self) -> u64 {
        Order::find()
            .count(self.db.as_ref())
            .await
            .expect("count orders")
    }

    pub async fn order(&self, id: Uuid) -> order::Model {
        Order::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("load order")
            .expect("order exists")
    }

    /// Jobs queued so far, without delivering them
    pub fn drain_notifications(&mut self) -> Vec<NotificationJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.notifications.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// Hands every queued job to the worker, as the background task would
    pub async fn deliver_notifications(&mut self) -> Vec<NotificationJob> {
        let jobs = self.drain_notifications();
        for job in &jobs {
            self.worker.handle(job.clone()).await;
        }
        jobs
    }

    /// Hands every queued job to a worker using `mailer`, returning the delivery outcomes
    pub async fn deliver_notifications_via(&mut self, mailer: Arc<dyn Mailer>) -> Vec<bool> {
        let worker = NotificationWorker::new(mailer, self.db.clone());
        let mut outcomes = Vec::new();
        for job in self.drain_notifications() {
            outcomes.push(worker.handle(job).await);
        }
        outcomes
    }

    pub fn token_for(&self, actor: &Actor) -> String {
        self.auth
            .generate_token(actor.user_id, None, None, &[actor.role])
            .expect("mint token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
