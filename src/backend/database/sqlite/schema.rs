use crate::error::AppResult;
use sqlx::SqlitePool;

use crate::backend::database::map_database_error;

const TABLES: [(&str, &str); 4] = [
    (
        "brands",
        r#"
        CREATE TABLE IF NOT EXISTS brands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            brand_name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT NOT NULL
        )
        "#,
    ),
    (
        "waxes",
        r#"
        CREATE TABLE IF NOT EXISTS waxes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL UNIQUE,
            brand_id INTEGER NOT NULL REFERENCES brands (id),
            price REAL NOT NULL,
            limited_edition BOOLEAN NOT NULL DEFAULT 0,
            category TEXT NOT NULL,
            strength INTEGER,
            description TEXT
        )
        "#,
    ),
    (
        "wax_owners",
        r#"
        CREATE TABLE IF NOT EXISTS wax_owners (
            user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES waxes (id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL,
            personal_rating INTEGER,
            PRIMARY KEY (user_id, product_id)
        )
        "#,
    ),
];

const INDEXES: [&str; 5] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_users_username_lower ON users (LOWER(username))",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_brands_name_lower ON brands (LOWER(brand_name))",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_waxes_name_lower ON waxes (LOWER(product_name))",
    "CREATE INDEX IF NOT EXISTS idx_waxes_brand_id ON waxes (brand_id)",
    "CREATE INDEX IF NOT EXISTS idx_wax_owners_product_id ON wax_owners (product_id)",
];

/// Create the catalog tables for SQLite
///
/// Tables are created in dependency order so foreign keys resolve.
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    for (table, sql) in TABLES {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| map_database_error(e, &format!("Failed to create {} table", table)))?;
    }

    create_indexes(pool).await
}

async fn create_indexes(pool: &SqlitePool) -> AppResult<()> {
    for sql in INDEXES {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| map_database_error(e, "Failed to create index"))?;
    }

    Ok(())
}

/// Drop the catalog tables, dependents first
pub async fn drop_schema(pool: &SqlitePool) -> AppResult<()> {
    for (table, _) in TABLES.iter().rev() {
        let sql = format!("DROP TABLE IF EXISTS {}", table);
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| map_database_error(e, &format!("Failed to drop table {}", table)))?;
    }

    Ok(())
}
