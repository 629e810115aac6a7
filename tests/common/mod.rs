#![allow(dead_code)]

use std::sync::Arc;

use wax_catalog::backend::database::DatabaseBackendConfig;
use wax_catalog::backend::{Backend, BackendFactory, CatalogBackend};
use wax_catalog::models::{Brand, User, Wax, ADMIN_ROLE};
use wax_catalog::password::{BcryptHasher, PasswordAlgorithm, PasswordManager};
use wax_catalog::startup::AppContext;

pub const ADMIN_USERNAME: &str = "wickmaster";
pub const ADMIN_PASSWORD: &str = "Melt&Pour2024";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestDatabaseType {
    Sqlite,
    Postgres,
}

/// Run the same async test against SQLite and, when `TEST_DATABASE_URL`
/// is set, PostgreSQL. Postgres variants share one database and run serially.
macro_rules! matrix_test {
    ($test_name:ident, $test_fn:ident) => {
        paste::paste! {
            #[tokio::test]
            async fn [<$test_name _sqlite>]() {
                $test_fn(common::TestDatabaseType::Sqlite).await;
            }

            #[tokio::test]
            #[serial_test::serial(postgres)]
            async fn [<$test_name _postgres>]() {
                if common::postgres_url().is_none() {
                    eprintln!("TEST_DATABASE_URL not set, skipping");
                    return;
                }
                $test_fn(common::TestDatabaseType::Postgres).await;
            }
        }
    };
}

pub fn postgres_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// In-memory SQLite backend with a single connection and fresh tables
pub async fn setup_test_database() -> Arc<dyn CatalogBackend> {
    let config = DatabaseBackendConfig::memory_sqlite().with_max_connections(1);
    let backend = BackendFactory::create(&config).await.unwrap();
    backend.init_schema().await.unwrap();
    backend
}

/// PostgreSQL backend with the catalog tables dropped and recreated
pub async fn setup_postgres_test_database() -> Arc<dyn CatalogBackend> {
    let url = postgres_url().expect("TEST_DATABASE_URL must be set");
    let config = DatabaseBackendConfig::postgres(url).with_max_connections(5);
    let backend = BackendFactory::create(&config).await.unwrap();
    backend.drop_schema().await.unwrap();
    backend.init_schema().await.unwrap();
    backend
}

pub async fn setup_backend(db_type: TestDatabaseType) -> Arc<dyn CatalogBackend> {
    match db_type {
        TestDatabaseType::Sqlite => setup_test_database().await,
        TestDatabaseType::Postgres => setup_postgres_test_database().await,
    }
}

/// Bcrypt at the minimum cost keeps hashing out of the test runtime
pub fn fast_passwords() -> Arc<PasswordManager> {
    Arc::new(PasswordManager::with_hashers(
        PasswordAlgorithm::Bcrypt,
        vec![Box::new(BcryptHasher::with_cost(4).unwrap())],
    ))
}

pub async fn setup_context(db_type: TestDatabaseType) -> AppContext {
    let backend = setup_backend(db_type).await;
    AppContext::from_backend(backend, fast_passwords(), ADMIN_ROLE)
}

/// Context with the admin account already bootstrapped
pub async fn setup_context_with_admin(db_type: TestDatabaseType) -> AppContext {
    let context = setup_context(db_type).await;
    context
        .bootstrap_admin(ADMIN_USERNAME, ADMIN_PASSWORD, "Catalog", "Admin")
        .await
        .unwrap()
        .expect("admin should be created on an empty user table");
    context
}

pub async fn add_brand(context: &AppContext, name: &str) -> Brand {
    context.brands.add(Brand::new(name)).await.unwrap()
}

pub fn lemon_basil() -> Wax {
    Wax::new("Lemon Basil", "ScentSationals", 2.5, false, "Citrus")
        .with_strength(4)
        .with_description("Zesty lemon over sweet basil")
}

pub fn collector(username: &str) -> User {
    User::new(username, "Collect0r!Wax", "Sam", "Collector", "User")
}
