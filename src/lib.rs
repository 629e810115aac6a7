pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod startup;
pub mod validator;

pub use error::{AppError, AppResult};
pub use models::{Brand, Owned, OwnedKey, User, Wax};
