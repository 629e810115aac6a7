use super::{PasswordAlgorithm, PasswordHasher};
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash,
    PasswordHasher as Argon2PasswordHasher, PasswordVerifier, Version,
};

/// 19 MiB of memory, 2 iterations, 1 lane
const MEMORY_COST_KIB: u32 = 19456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

pub struct Argon2idHasher {
    argon2: Argon2<'static>,
}

impl Argon2idHasher {
    pub fn new() -> Self {
        let params =
            Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(32)).unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2idHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2idHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "Argon2id hashing failed");
                AppError::InternalServer("Failed to hash password".to_string())
            })
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = %e, "Stored Argon2id hash is malformed");
            AppError::InternalServer("Failed to verify password".to_string())
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                tracing::error!(error = %e, "Argon2id verification failed");
                Err(AppError::InternalServer(
                    "Failed to verify password".to_string(),
                ))
            }
        }
    }

    fn is_hash(&self, value: &str) -> bool {
        value.starts_with("$argon2id$")
            && PasswordHash::new(value)
                .map(|parsed| parsed.hash.is_some() && parsed.salt.is_some())
                .unwrap_or(false)
    }

    fn algorithm(&self) -> PasswordAlgorithm {
        PasswordAlgorithm::Argon2id
    }
}
