use crate::backend::database::{DatabaseBackendConfig, SqlExecutor};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

pub mod database;

/// Supported database backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl FromStr for DatabaseType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSQL),
            "sqlite" => Ok(DatabaseType::SQLite),
            other => Err(AppError::InternalConfiguration(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

/// Lifecycle of a storage backend.
///
/// Statement execution lives in [`SqlExecutor`]; this trait covers connecting,
/// probing and provisioning the catalog tables.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Connect and initialize the storage backend
    async fn connect(config: &DatabaseBackendConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Check if the storage backend is healthy and accessible
    async fn health_check(&self) -> AppResult<()>;

    /// Create the catalog tables and indexes if they do not exist
    async fn init_schema(&self) -> AppResult<()>;

    /// Drop every catalog table
    async fn drop_schema(&self) -> AppResult<()>;

    /// Release pooled connections
    async fn cleanup(&self) -> AppResult<()> {
        Ok(())
    }
}

/// A backend that can both be managed and run catalog statements
pub trait CatalogBackend: Backend + SqlExecutor {}

impl<T> CatalogBackend for T where T: Backend + SqlExecutor {}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend based on configuration
    pub async fn create(config: &DatabaseBackendConfig) -> AppResult<Arc<dyn CatalogBackend>> {
        let backend = Self::create_backend(config).await?;
        Ok(Arc::from(backend))
    }

    pub async fn create_backend(
        config: &DatabaseBackendConfig,
    ) -> AppResult<Box<dyn CatalogBackend>> {
        match config.database_type {
            DatabaseType::PostgreSQL => {
                let backend = database::postgres::PostgresBackend::connect(config).await?;
                Ok(Box::new(backend))
            }
            DatabaseType::SQLite => {
                let backend = database::sqlite::SqliteBackend::connect(config).await?;
                Ok(Box::new(backend))
            }
        }
    }
}
