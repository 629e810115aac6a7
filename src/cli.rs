//! Command-line front end over the catalog services.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::auth::Principal;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::repository::Entity;
use crate::service::Service;
use crate::startup::AppContext;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(name = "wax-catalog")]
#[command(about = "Manage a catalog of wax melts, brands, users and collections")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Database URL (overrides config file)
    #[arg(long)]
    pub database_url: Option<String>,

    /// User to authenticate as for mutating commands
    #[arg(short, long, env = "WAX_USERNAME")]
    pub username: Option<String>,

    #[arg(short, long, env = "WAX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the catalog tables and, on an empty user table, the first admin
    Init {
        #[arg(long)]
        admin_username: Option<String>,
        #[arg(long)]
        admin_password: Option<String>,
        #[arg(long, default_value = "Catalog")]
        admin_first_name: String,
        #[arg(long, default_value = "Admin")]
        admin_last_name: String,
    },
    /// Print every entity of a kind
    List { entity: EntityKind },
    /// Print one entity by id (`userId:waxId` for owned)
    Get { entity: EntityKind, id: String },
    /// Print the first entity whose searchable attribute matches
    Find {
        entity: EntityKind,
        key: String,
        value: String,
    },
    /// Insert an entity given as a JSON document
    Add { entity: EntityKind, json: String },
    /// Update an entity given as a JSON document carrying its key
    Update { entity: EntityKind, json: String },
    /// Delete an entity by id
    Delete { entity: EntityKind, id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Brand,
    Wax,
    Owned,
}

impl Command {
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Add { .. } | Command::Update { .. } | Command::Delete { .. }
        )
    }
}

impl Cli {
    /// Config file when present, built-in defaults otherwise, then overrides
    pub fn load_config(&self) -> Result<AppConfig, String> {
        let mut config =
            if self.config == DEFAULT_CONFIG_PATH && !Path::new(DEFAULT_CONFIG_PATH).exists() {
                AppConfig::default_config()
            } else {
                AppConfig::load_from_file(&self.config)?
            };

        if let Some(url) = &self.database_url {
            config.database.db_type = if url.starts_with("postgres") {
                "postgresql".to_string()
            } else {
                "sqlite".to_string()
            };
            config.database.url = url.clone();
        }

        Ok(config)
    }

    async fn principal(&self, context: &AppContext) -> AppResult<Principal> {
        let username = self.username.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        context
            .authenticator
            .authenticate_admin(username, password)
            .await
    }
}

/// Run one command against a wired context and return its JSON result
pub async fn execute(cli: &Cli, context: &AppContext) -> AppResult<Value> {
    if cli.command.is_mutating() {
        let principal = cli.principal(context).await?;
        tracing::debug!(user_id = principal.id, "Authorized mutating command");
    }

    match &cli.command {
        Command::Init {
            admin_username,
            admin_password,
            admin_first_name,
            admin_last_name,
        } => {
            let admin = match (admin_username, admin_password) {
                (Some(username), Some(password)) => {
                    context
                        .bootstrap_admin(username, password, admin_first_name, admin_last_name)
                        .await?
                }
                (None, None) => None,
                _ => {
                    return Err(AppError::BadRequest(
                        "Both --admin-username and --admin-password are required".to_string(),
                    ))
                }
            };
            Ok(json!({ "initialized": true, "admin": admin }))
        }
        command => match command_entity(command) {
            EntityKind::User => run(&context.users, command).await,
            EntityKind::Brand => run(&context.brands, command).await,
            EntityKind::Wax => run(&context.waxes, command).await,
            EntityKind::Owned => run(&context.owned, command).await,
        },
    }
}

fn command_entity(command: &Command) -> EntityKind {
    match command {
        Command::List { entity }
        | Command::Get { entity, .. }
        | Command::Find { entity, .. }
        | Command::Add { entity, .. }
        | Command::Update { entity, .. }
        | Command::Delete { entity, .. } => *entity,
        Command::Init { .. } => EntityKind::User,
    }
}

async fn run<E: Entity>(service: &Service<E>, command: &Command) -> AppResult<Value> {
    match command {
        Command::List { .. } => to_json(&service.get_all().await?),
        Command::Get { id, .. } => to_json(&service.get_by_raw_id(id).await?),
        Command::Find { key, value, .. } => {
            let query = HashMap::from([(key.clone(), value.clone())]);
            to_json(&service.get_by_unique_key(&query).await?)
        }
        Command::Add { json, .. } => {
            let entity: E = serde_json::from_str(json)?;
            to_json(&service.add(entity).await?)
        }
        Command::Update { json, .. } => {
            let entity: E = serde_json::from_str(json)?;
            let updated = service.update(&entity).await?;
            Ok(json!({ "updated": updated }))
        }
        Command::Delete { id, .. } => {
            let deleted = service.delete_by_raw_id(id).await?;
            Ok(json!({ "deleted": deleted }))
        }
        Command::Init { .. } => Err(AppError::InternalConfiguration(
            "init is not an entity command".to_string(),
        )),
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InternalServer(format!("Failed to serialize result: {}", e)))
}

/// Process exit code for an error: the status class, 4 or 5
pub fn exit_code(error: &AppError) -> i32 {
    i32::from(error.status_code().as_u16() / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_find() {
        let cli = Cli::try_parse_from([
            "wax-catalog",
            "find",
            "wax",
            "productName",
            "Lemon Basil",
        ])
        .unwrap();

        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert_eq!(
            cli.command,
            Command::Find {
                entity: EntityKind::Wax,
                key: "productName".to_string(),
                value: "Lemon Basil".to_string(),
            }
        );
        assert!(!cli.command.is_mutating());
    }

    #[test]
    fn test_parse_delete_with_credentials() {
        let cli = Cli::try_parse_from([
            "wax-catalog",
            "--username",
            "root",
            "--password",
            "secret",
            "delete",
            "owned",
            "1:2",
        ])
        .unwrap();

        assert_eq!(cli.username.as_deref(), Some("root"));
        assert!(cli.command.is_mutating());
        assert_eq!(command_entity(&cli.command), EntityKind::Owned);
    }

    #[test]
    fn test_unknown_entity_rejected() {
        assert!(Cli::try_parse_from(["wax-catalog", "list", "candle"]).is_err());
    }

    #[test]
    fn test_database_url_override() {
        let cli = Cli::try_parse_from([
            "wax-catalog",
            "--database-url",
            "postgres://localhost/waxes",
            "list",
            "brand",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.database.db_type, "postgresql");
        assert_eq!(config.database.url, "postgres://localhost/waxes");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&AppError::not_found()), 4);
        assert_eq!(
            exit_code(&AppError::InternalServer("boom".to_string())),
            5
        );
    }
}
