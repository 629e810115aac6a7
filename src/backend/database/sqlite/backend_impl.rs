use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use super::super::config::DatabaseBackendConfig;
use crate::backend::database::{
    map_database_error, with_timeout, ColumnKind, ColumnSpec, Dialect, Record, SqlExecutor,
    SqlValue,
};
use crate::backend::Backend;
use crate::error::{AppError, AppResult};

/// SQLite database backend
pub struct SqliteBackend {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_values<'q>(mut query: SqliteQuery<'q>, args: &[SqlValue]) -> SqliteQuery<'q> {
    for arg in args {
        query = match arg {
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Boolean(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow, columns: &[ColumnSpec]) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in columns {
        let value = match column.kind {
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(column.name)?
                .map(SqlValue::Integer),
            ColumnKind::Real => row
                .try_get::<Option<f64>, _>(column.name)?
                .map(SqlValue::Real),
            ColumnKind::Boolean => row
                .try_get::<Option<bool>, _>(column.name)?
                .map(SqlValue::Boolean),
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(column.name)?
                .map(SqlValue::Text),
        };
        record.push(column.name, value);
    }
    Ok(record)
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn connect(config: &DatabaseBackendConfig) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::InternalConfiguration(format!("Invalid SQLite config: {}", e)))?;

        let url = if config.is_memory_database() {
            "sqlite::memory:"
        } else {
            config.connection_url.as_str()
        };

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                AppError::InternalConfiguration(format!("Invalid SQLite connection URL: {}", e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout_duration());

        // An in-memory database lives only as long as one of its connections
        if config.is_memory_database() {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| map_database_error(e, "Failed to connect to SQLite"))?;

        tracing::info!(
            url = %url,
            max_connections = config.max_connections,
            "Connected to SQLite"
        );

        Ok(Self::new(pool, config.query_timeout_duration()))
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_database_error(e, "Health check failed"))?;

        Ok(())
    }

    async fn init_schema(&self) -> AppResult<()> {
        super::schema::init_schema(&self.pool).await
    }

    async fn drop_schema(&self) -> AppResult<()> {
        super::schema::drop_schema(&self.pool).await
    }

    async fn cleanup(&self) -> AppResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(
        &self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnSpec],
    ) -> AppResult<Vec<Record>> {
        with_timeout(self.query_timeout, "Failed to fetch rows", async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| map_database_error(e, "Failed to acquire connection"))?;

            let rows = bind_values(sqlx::query(sql), args)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| map_database_error(e, "Failed to fetch rows"))?;

            rows.iter()
                .map(|row| decode_row(row, columns))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| map_database_error(e, "Failed to decode row"))
        })
        .await
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnSpec],
    ) -> AppResult<Option<Record>> {
        with_timeout(self.query_timeout, "Failed to fetch row", async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| map_database_error(e, "Failed to acquire connection"))?;

            let row = bind_values(sqlx::query(sql), args)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| map_database_error(e, "Failed to fetch row"))?;

            row.as_ref()
                .map(|row| decode_row(row, columns))
                .transpose()
                .map_err(|e| map_database_error(e, "Failed to decode row"))
        })
        .await
    }

    async fn execute(&self, sql: &str, args: &[SqlValue]) -> AppResult<u64> {
        with_timeout(self.query_timeout, "Failed to execute statement", async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| map_database_error(e, "Failed to acquire connection"))?;

            let result = bind_values(sqlx::query(sql), args)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_database_error(e, "Failed to execute statement"))?;

            Ok(result.rows_affected())
        })
        .await
    }
}
