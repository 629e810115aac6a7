use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::backend::database::DatabaseBackendConfig;
use crate::backend::DatabaseType;
use crate::error::{AppError, AppResult};
use crate::models::ADMIN_ROLE;
use crate::password::PasswordAlgorithm;

/// Catalog database used when no config file is present
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./wax-catalog.db";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub db_type: String,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_secs")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Role a user needs to add, update or delete anything
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    /// Algorithm for newly hashed passwords; both formats always verify
    #[serde(default = "default_password_algorithm")]
    pub password_algorithm: String,
}

fn default_admin_role() -> String {
    ADMIN_ROLE.to_string()
}

fn default_password_algorithm() -> String {
    PasswordAlgorithm::default().to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_role: default_admin_role(),
            password_algorithm: default_password_algorithm(),
        }
    }
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, String> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_yaml(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Parse YAML content after expanding `${VAR}` references
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let expanded = Self::expand_env_vars(content)?;
        let config: AppConfig = serde_yaml::from_str(&expanded).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// File-backed SQLite in the working directory, info logging, argon2id hashing
    pub fn default_config() -> Self {
        AppConfig {
            database: DatabaseConfig {
                db_type: "sqlite".to_string(),
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: default_max_connections(),
                connection_timeout_secs: default_timeout_secs(),
                query_timeout_secs: default_timeout_secs(),
            },
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        DatabaseType::from_str(&self.database.db_type).map_err(|e| e.message().to_string())?;
        PasswordAlgorithm::from_str(&self.auth.password_algorithm)
            .map_err(|e| e.message().to_string())?;
        if self.auth.admin_role.trim().is_empty() {
            return Err("auth.admin_role must not be empty".to_string());
        }
        Ok(())
    }

    pub fn to_backend_config(&self) -> AppResult<DatabaseBackendConfig> {
        let database_type = DatabaseType::from_str(&self.database.db_type)?;
        let config = DatabaseBackendConfig::new(database_type, self.database.url.clone())
            .with_max_connections(self.database.max_connections)
            .with_connection_timeout(self.database.connection_timeout_secs)
            .with_query_timeout(self.database.query_timeout_secs);

        config.validate().map_err(AppError::InternalConfiguration)?;
        Ok(config)
    }

    pub fn password_algorithm(&self) -> AppResult<PasswordAlgorithm> {
        PasswordAlgorithm::from_str(&self.auth.password_algorithm)
    }

    /// Expand environment variables in format ${VAR_NAME} or ${VAR_NAME:-default}
    fn expand_env_vars(content: &str) -> Result<String, String> {
        let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .map_err(|e| format!("Invalid expansion pattern: {}", e))?;

        let mut missing = None;
        let expanded = pattern.replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match (std::env::var(name), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(format!(
                "Environment variable {} not found and no default provided",
                name
            )),
            None => Ok(expanded.into_owned()),
        }
    }
}
