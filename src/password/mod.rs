//! Password hashing for catalog users.
//!
//! Plaintext passwords only ever reach the database through
//! [`PasswordManager::hash_password`]; read queries never select the hash.

use crate::error::{AppError, AppResult};
use std::str::FromStr;

pub mod argon2_hasher;
pub mod bcrypt_hasher;

pub use argon2_hasher::Argon2idHasher;
pub use bcrypt_hasher::BcryptHasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordAlgorithm {
    Bcrypt,
    #[default]
    Argon2id,
}

impl std::fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bcrypt => write!(f, "bcrypt"),
            Self::Argon2id => write!(f, "argon2id"),
        }
    }
}

impl FromStr for PasswordAlgorithm {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(Self::Bcrypt),
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            other => Err(AppError::InternalConfiguration(format!(
                "Unsupported password algorithm: {}",
                other
            ))),
        }
    }
}

pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> AppResult<String>;

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;

    /// Check if a stored value was produced by this algorithm
    fn is_hash(&self, value: &str) -> bool;

    fn algorithm(&self) -> PasswordAlgorithm;
}

/// Hashes new passwords with the configured algorithm and verifies
/// passwords stored with any supported one.
pub struct PasswordManager {
    current_algorithm: PasswordAlgorithm,
    hashers: Vec<Box<dyn PasswordHasher>>,
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new(PasswordAlgorithm::default())
    }
}

impl PasswordManager {
    pub fn new(algorithm: PasswordAlgorithm) -> Self {
        Self::with_hashers(
            algorithm,
            vec![Box::new(Argon2idHasher::new()), Box::new(BcryptHasher::new())],
        )
    }

    pub fn with_hashers(
        algorithm: PasswordAlgorithm,
        hashers: Vec<Box<dyn PasswordHasher>>,
    ) -> Self {
        Self {
            current_algorithm: algorithm,
            hashers,
        }
    }

    pub fn current_algorithm(&self) -> PasswordAlgorithm {
        self.current_algorithm
    }

    /// Validate and hash a plaintext password with the current algorithm
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        self.validate_password_strength(password)?;

        let hasher = self
            .hashers
            .iter()
            .find(|h| h.algorithm() == self.current_algorithm)
            .ok_or_else(|| {
                AppError::InternalConfiguration(format!(
                    "Hasher not found for algorithm: {}",
                    self.current_algorithm
                ))
            })?;

        hasher.hash_password(password)
    }

    /// Verify a plaintext password against a stored hash of any supported format
    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        match self.hashers.iter().find(|hasher| hasher.is_hash(hash)) {
            Some(hasher) => hasher.verify_password(password, hash),
            None => Err(AppError::InternalServer(
                "Stored password uses an unsupported hash format".to_string(),
            )),
        }
    }

    pub fn detect_algorithm(&self, hash: &str) -> Option<PasswordAlgorithm> {
        self.hashers
            .iter()
            .find(|hasher| hasher.is_hash(hash))
            .map(|hasher| hasher.algorithm())
    }

    /// At least 8 and at most 128 characters, with upper and lower case
    /// letters, a digit and a special character
    pub fn validate_password_strength(&self, password: &str) -> AppResult<()> {
        let length = password.chars().count();
        if length < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        if length > 128 {
            return Err(AppError::BadRequest(
                "Password must be no more than 128 characters long".to_string(),
            ));
        }

        let checks: [(fn(char) -> bool, &str); 4] = [
            (|c| c.is_lowercase(), "a lowercase letter"),
            (|c| c.is_uppercase(), "an uppercase letter"),
            (|c| c.is_ascii_digit(), "a digit"),
            (|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c), "a special character"),
        ];

        for (check, requirement) in checks {
            if !password.chars().any(check) {
                return Err(AppError::BadRequest(format!(
                    "Password must contain at least {}",
                    requirement
                )));
            }
        }

        Ok(())
    }
}
