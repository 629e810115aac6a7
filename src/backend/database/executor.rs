use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::value::{ColumnSpec, Dialect, Record, SqlValue};
use crate::error::{AppError, AppResult};

/// Database-specific adapter that runs parameterized statements.
///
/// Every call acquires one pooled connection and releases it before
/// returning, whatever the outcome.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a query and decode every row with the given column layout
    async fn fetch_all(
        &self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnSpec],
    ) -> AppResult<Vec<Record>>;

    /// Run a query and decode at most one row
    async fn fetch_optional(
        &self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnSpec],
    ) -> AppResult<Option<Record>>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> AppResult<u64>;
}

/// Map driver errors to AppError; driver detail is logged, never returned.
///
/// Unique violations lose an add race and become `ResourcePersistence`,
/// foreign key violations become `BadRequest`, everything else `InternalServer`.
pub fn map_database_error(error: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(ref db_error) = error {
        if db_error.is_unique_violation() {
            tracing::warn!(error = %db_error, "{}: unique constraint violated", context);
            return AppError::ResourcePersistence(
                "The provided resource conflicts with an existing one".to_string(),
            );
        }
        if db_error.is_foreign_key_violation() {
            tracing::warn!(error = %db_error, "{}: foreign key constraint violated", context);
            return AppError::BadRequest(
                "The request references a resource that does not exist or is still in use"
                    .to_string(),
            );
        }
    }

    tracing::error!(error = %error, "{}", context);
    AppError::InternalServer(context.to_string())
}

/// Bound a database future by the configured query timeout
pub async fn with_timeout<T, F>(timeout: Duration, context: &str, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "{}: timed out", context);
            Err(AppError::InternalServer(format!("{}: timed out", context)))
        }
    }
}
