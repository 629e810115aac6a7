use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::AppResult;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Output goes to stderr; stdout carries command results.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},sqlx=warn", config.level)))
        .map_err(|e| format!("Invalid log level '{}': {}", config.level, e))?;

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };

    result.map_err(|e| format!("Failed to initialize tracing: {}", e))
}

/// Access log entry for one service operation, emitted under the
/// `access_log` target when the operation finishes.
pub struct OperationLog {
    entity: &'static str,
    operation: &'static str,
    start: Instant,
}

impl OperationLog {
    pub fn start(entity: &'static str, operation: &'static str) -> Self {
        Self {
            entity,
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish<T>(self, result: &AppResult<T>) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let (outcome, status) = match result {
            Ok(_) => ("ok", 200),
            Err(e) => (e.kind(), e.status_code().as_u16()),
        };

        info!(
            target: "access_log",
            entity = self.entity,
            operation = self.operation,
            outcome,
            status,
            elapsed_ms,
            "{} {} {} {}ms",
            self.entity,
            self.operation,
            status,
            elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_operation_log_accepts_both_outcomes() {
        OperationLog::start("Brand", "get_all").finish(&Ok::<_, AppError>(()));
        OperationLog::start("Brand", "get_by_id").finish::<()>(&Err(AppError::not_found()));
    }
}
