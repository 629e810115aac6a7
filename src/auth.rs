use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::password::PasswordManager;
use crate::repository::Repository;
use crate::validator;

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: String,
}

/// Checks username/password pairs against stored user credentials
pub struct Authenticator {
    users: Arc<Repository<User>>,
    passwords: Arc<PasswordManager>,
    admin_role: String,
}

impl Authenticator {
    pub fn new(
        users: Arc<Repository<User>>,
        passwords: Arc<PasswordManager>,
        admin_role: impl Into<String>,
    ) -> Self {
        Self {
            users,
            passwords,
            admin_role: admin_role.into(),
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal> {
        if !validator::is_valid_strings(&[username, password]) {
            return Err(AppError::Authentication(
                "Username and password are required".to_string(),
            ));
        }

        let Some((user, hash)) = self.users.find_credentials(username).await? else {
            tracing::info!(username, "Authentication failed: unknown user");
            return Err(invalid_credentials());
        };

        if !self.passwords.verify_password(password, &hash)? {
            tracing::info!(username, "Authentication failed: wrong password");
            return Err(invalid_credentials());
        }

        let id = user.id.ok_or_else(|| {
            AppError::InternalServer("Stored user is missing its id".to_string())
        })?;

        tracing::debug!(user_id = id, role = %user.role, "Authenticated");
        Ok(Principal {
            id,
            username: user.username,
            role: user.role,
        })
    }

    /// Authenticate and require the privileged role
    pub async fn authenticate_admin(&self, username: &str, password: &str) -> AppResult<Principal> {
        let principal = self.authenticate(username, password).await?;
        require_role(&principal, &self.admin_role)?;
        Ok(principal)
    }
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("Invalid username or password".to_string())
}

pub fn require_role(principal: &Principal, role: &str) -> AppResult<()> {
    if principal.role == role {
        Ok(())
    } else {
        tracing::info!(
            user_id = principal.id,
            required = role,
            "Authorization failed"
        );
        Err(AppError::Authorization(format!(
            "The '{}' role is required for this operation",
            role
        )))
    }
}
