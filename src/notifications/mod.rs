//! Email notifications sent after a workflow has committed.
//!
//! Services hand a [`NotificationJob`] to the [`NotificationDispatcher`], which
//! queues it on a bounded channel without waiting. A [`NotificationWorker`]
//! task drains the channel, renders each job into an [`EmailMessage`] and
//! delivers it through a [`Mailer`]. Delivery problems are logged and counted;
//! they never reach the request that caused them.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::restock_request::{self, RestockStatus};

/// A rendered plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail relay rejected message with status {status}")]
    Rejected { status: u16 },
    #[error("Mail delivery failed after {0} attempts")]
    Exhausted(u32),
}

/// Outbound email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email (log transport)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// POSTs each message as JSON to a mail relay, retrying with exponential backoff
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
    max_attempts: u32,
    base_backoff: Duration,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            from: from.into(),
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        })
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        for attempt in 1..=self.max_attempts {
            match self.client.post(&self.endpoint).json(&payload).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) if response.status().is_client_error() => {
                    // the relay will not accept this message on a retry either
                    return Err(NotificationError::Rejected {
                        status: response.status().as_u16(),
                    });
                }
                Ok(response) => warn!(
                    "Mail relay returned {} (attempt {}/{})",
                    response.status(),
                    attempt,
                    self.max_attempts
                ),
                Err(e) => warn!(
                    "Mail relay error: {} (attempt {}/{})",
                    e, attempt, self.max_attempts
                ),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.base_backoff * 2_u32.pow(attempt - 1)).await;
            }
        }

        Err(NotificationError::Exhausted(self.max_attempts))
    }
}

/// Work item queued for the notification worker
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationJob {
    OrderPlaced {
        order_id: Uuid,
        order_number: String,
        customer_name: String,
        customer_email: String,
        total_amount: Decimal,
        item_count: usize,
    },
    OrderDispatched {
        order_id: Uuid,
        order_number: String,
        customer_name: String,
        customer_email: String,
    },
    RestockRequested {
        restock_request_id: Uuid,
        product_name: String,
        sku: String,
        current_stock: i32,
        threshold: i32,
        requested_quantity: i32,
        supplier_name: Option<String>,
        supplier_email: String,
    },
}

impl NotificationJob {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationJob::OrderPlaced { .. } => "order_placed",
            NotificationJob::OrderDispatched { .. } => "order_dispatched",
            NotificationJob::RestockRequested { .. } => "restock_requested",
        }
    }

    pub fn render(&self) -> EmailMessage {
        match self {
            NotificationJob::OrderPlaced {
                order_number,
                customer_name,
                customer_email,
                total_amount,
                item_count,
                ..
            } => EmailMessage {
                to: customer_email.clone(),
                subject: format!("Order {} confirmed", order_number),
                body: format!(
                    "Hi {},\n\nWe received your order {} ({} item(s), total {}).\nWe will let you know when it ships.\n",
                    customer_name, order_number, item_count, total_amount
                ),
            },
            NotificationJob::OrderDispatched {
                order_number,
                customer_name,
                customer_email,
                ..
            } => EmailMessage {
                to: customer_email.clone(),
                subject: format!("Order {} dispatched", order_number),
                body: format!(
                    "Hi {},\n\nYour order {} is on its way. Please confirm delivery once it arrives.\n",
                    customer_name, order_number
                ),
            },
            NotificationJob::RestockRequested {
                product_name,
                sku,
                current_stock,
                threshold,
                requested_quantity,
                supplier_name,
                supplier_email,
                ..
            } => EmailMessage {
                to: supplier_email.clone(),
                subject: format!("Restock request: {} ({})", product_name, sku),
                body: format!(
                    "Hello {},\n\nPlease supply {} unit(s) of {} (SKU {}).\nCurrent stock: {}, minimum level: {}.\n",
                    supplier_name.as_deref().unwrap_or("supplier"),
                    requested_quantity,
                    product_name,
                    sku,
                    current_stock,
                    threshold
                ),
            },
        }
    }
}

/// Cloneable, non-blocking handle for queueing notification jobs
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationJob>,
}

impl NotificationDispatcher {
    pub fn new(sender: mpsc::Sender<NotificationJob>) -> Self {
        Self { sender }
    }

    /// Creates a dispatcher and the receiver a worker should drain
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Queues a job. Returns whether it was accepted; a full or closed queue
    /// drops the job with a warning.
    pub fn dispatch(&self, job: NotificationJob) -> bool {
        let kind = job.kind();
        match self.sender.try_send(job) {
            Ok(()) => {
                counter!("bizops.notifications.queued", 1, "kind" => kind);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(kind, "notification queue full, dropping job");
                counter!("bizops.notifications.dropped", 1, "kind" => kind);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(kind, "notification worker stopped, dropping job");
                counter!("bizops.notifications.dropped", 1, "kind" => kind);
                false
            }
        }
    }
}

/// Delivers queued jobs and records supplier contact on restock requests
#[derive(Clone)]
pub struct NotificationWorker {
    mailer: Arc<dyn Mailer>,
    db: Arc<DatabaseConnection>,
}

impl NotificationWorker {
    pub fn new(mailer: Arc<dyn Mailer>, db: Arc<DatabaseConnection>) -> Self {
        Self { mailer, db }
    }

    /// Processes one job. Returns whether the email was delivered.
    #[instrument(skip(self, job), fields(kind = job.kind()))]
    pub async fn handle(&self, job: NotificationJob) -> bool {
        let message = job.render();
        let kind = job.kind();

        if let Err(e) = self.mailer.send(&message).await {
            error!(error = %e, to = %message.to, "failed to send notification email");
            counter!("bizops.notifications.failed", 1, "kind" => kind);
            return false;
        }
        counter!("bizops.notifications.sent", 1, "kind" => kind);

        if let NotificationJob::RestockRequested {
            restock_request_id, ..
        } = job
        {
            self.mark_email_sent(restock_request_id).await;
        }
        true
    }

    /// Runs until every dispatcher handle has been dropped
    pub async fn run(self, mut rx: mpsc::Receiver<NotificationJob>) {
        info!("Starting notification worker");
        while let Some(job) = rx.recv().await {
            self.handle(job).await;
        }
        info!("Notification worker stopped");
    }

    async fn mark_email_sent(&self, restock_request_id: Uuid) {
        let now = Utc::now();
        let result = restock_request::Entity::update_many()
            .col_expr(
                restock_request::Column::Status,
                Expr::value(RestockStatus::EmailSent),
            )
            .col_expr(restock_request::Column::EmailSentAt, Expr::value(now))
            .col_expr(restock_request::Column::UpdatedAt, Expr::value(now))
            .filter(restock_request::Column::Id.eq(restock_request_id))
            .filter(restock_request::Column::Status.eq(RestockStatus::Pending))
            .exec(self.db.as_ref())
            .await;

        match result {
            Ok(res) if res.rows_affected == 1 => {
                info!(%restock_request_id, "restock request marked EMAIL_SENT")
            }
            // resends on an EMAIL_SENT request leave it as is
            Ok(_) => {}
            Err(e) => error!(
                %restock_request_id,
                error = %e,
                "failed to record supplier email on restock request"
            ),
        }
    }
}
