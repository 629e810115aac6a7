use std::sync::Arc;

use crate::auth::Authenticator;
use crate::backend::{Backend, BackendFactory, CatalogBackend};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::models::{Brand, Owned, User, Wax};
use crate::password::PasswordManager;
use crate::repository::{CrudRepository, Repository, WriteContext};
use crate::service::Service;

/// Everything a front end needs, wired once per process
pub struct AppContext {
    pub backend: Arc<dyn CatalogBackend>,
    pub passwords: Arc<PasswordManager>,
    pub users: Service<User>,
    pub brands: Service<Brand>,
    pub waxes: Service<Wax>,
    pub owned: Service<Owned>,
    pub authenticator: Authenticator,
    user_repository: Arc<Repository<User>>,
}

impl AppContext {
    /// Connect, create the catalog tables if needed, and wire the services
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let backend_config = config.to_backend_config()?;
        let passwords = Arc::new(PasswordManager::new(config.password_algorithm()?));

        tracing::info!(
            database = %config.database.db_type,
            password_algorithm = %passwords.current_algorithm(),
            "Setting up backend"
        );

        let backend = BackendFactory::create(&backend_config).await?;
        backend.init_schema().await?;

        Ok(Self::from_backend(backend, passwords, &config.auth.admin_role))
    }

    /// Wire services over an already initialized backend
    pub fn from_backend(
        backend: Arc<dyn CatalogBackend>,
        passwords: Arc<PasswordManager>,
        admin_role: &str,
    ) -> Self {
        let context = WriteContext::new(Arc::clone(&passwords));

        let user_repository = Arc::new(Repository::<User>::new(
            Arc::clone(&backend),
            context.clone(),
        ));
        let brand_repository: Arc<dyn CrudRepository<Brand>> = Arc::new(Repository::<Brand>::new(
            Arc::clone(&backend),
            context.clone(),
        ));
        let wax_repository: Arc<dyn CrudRepository<Wax>> = Arc::new(Repository::<Wax>::new(
            Arc::clone(&backend),
            context.clone(),
        ));
        let owned_repository: Arc<dyn CrudRepository<Owned>> =
            Arc::new(Repository::<Owned>::new(Arc::clone(&backend), context));

        let users: Arc<dyn CrudRepository<User>> = user_repository.clone();
        let authenticator = Authenticator::new(
            Arc::clone(&user_repository),
            Arc::clone(&passwords),
            admin_role,
        );

        Self {
            backend,
            passwords,
            users: Service::new(users),
            brands: Service::new(brand_repository),
            waxes: Service::new(wax_repository),
            owned: Service::new(owned_repository),
            authenticator,
            user_repository,
        }
    }

    /// Create the first admin account. Does nothing once any user exists.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> AppResult<Option<User>> {
        if !self.user_repository.get_all().await?.is_empty() {
            tracing::info!("Users already exist, skipping admin bootstrap");
            return Ok(None);
        }

        let admin = User::new(
            username,
            password,
            first_name,
            last_name,
            self.authenticator.admin_role(),
        );
        let created = self.users.add(admin).await?;
        tracing::info!(user_id = ?created.id, username = %created.username, "Created admin user");
        Ok(Some(created))
    }
}
