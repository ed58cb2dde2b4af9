/*!
 * Transaction Helper Utilities
 *
 * Runs a unit of work inside one database transaction and folds sea-orm's
 * `TransactionError` back into `ServiceError`.
 */

use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction.
///
/// Commits when the closure returns `Ok`, rolls back otherwise. The closure's
/// own error is returned untouched so callers can match on the variant.
///
/// ```rust,ignore
/// let order = with_transaction(&db, move |txn| {
///     Box::pin(async move {
///         let order = order_model.insert(txn).await?;
///         for item in items {
///             item.insert(txn).await?;
///         }
///         Ok(order)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let result = db.transaction::<F, T, ServiceError>(f).await;

    match &result {
        Ok(_) => counter!("bizops.db.transaction.committed", 1),
        Err(e) => {
            debug!(error = %e, "transaction rolled back");
            counter!("bizops.db.transaction.rolled_back", 1);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(err) => err,
    })
}
