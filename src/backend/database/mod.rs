//! Database abstraction layer for the wax catalog
//!
//! Repositories describe their statements once, backend-neutrally; each
//! backend renders placeholders for its dialect and runs them.
//!
//! # Architecture
//!
//! ```text
//! Repository<E> (descriptor + rendered statement tables)
//!     ↓
//! SqlExecutor (value binding, row decoding, timeouts)
//!     ├── postgres/ (PostgreSQL-specific code)
//!     └── sqlite/   (SQLite-specific code)
//! ```

pub mod config;
pub mod executor;
pub mod postgres;
pub mod resolver;
pub mod sqlite;
pub mod value;

pub use config::DatabaseBackendConfig;
pub use executor::{map_database_error, with_timeout, SqlExecutor};
pub use resolver::{
    InsertColumn, InsertTemplate, ResolvedStatement, StatementTable, UpdateTemplate, WriteValues,
};
pub use value::{ColumnKind, ColumnSpec, Dialect, Record, SqlValue};
