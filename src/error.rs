use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Malformed or invalid caller input
    BadRequest(String),
    /// Valid request, but no matching data
    ResourceNotFound(String),
    /// The write would violate a uniqueness invariant
    ResourcePersistence(String),
    Authentication(String),
    Authorization(String),
    /// Unclassified datastore or driver failure
    InternalServer(String),
    /// A statement table or descriptor does not cover the requested variant
    InternalConfiguration(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::ResourceNotFound(e) => write!(f, "Resource not found: {}", e),
            AppError::ResourcePersistence(e) => write!(f, "Resource persistence error: {}", e),
            AppError::Authentication(e) => write!(f, "Authentication error: {}", e),
            AppError::Authorization(e) => write!(f, "Authorization error: {}", e),
            AppError::InternalServer(e) => write!(f, "Internal server error: {}", e),
            AppError::InternalConfiguration(e) => {
                write!(f, "Internal configuration error: {}", e)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request() -> Self {
        AppError::BadRequest("An invalid value was provided".to_string())
    }

    pub fn not_found() -> Self {
        AppError::ResourceNotFound("No resource found using provided parameters".to_string())
    }

    /// Name of the error kind as it appears in serialized payloads
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BadRequestError",
            AppError::ResourceNotFound(_) => "ResourceNotFoundError",
            AppError::ResourcePersistence(_) => "ResourcePersistenceError",
            AppError::Authentication(_) => "AuthenticationError",
            AppError::Authorization(_) => "AuthorizationError",
            AppError::InternalServer(_) => "InternalServerError",
            AppError::InternalConfiguration(_) => "InternalConfigurationError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::BadRequest(m)
            | AppError::ResourceNotFound(m)
            | AppError::ResourcePersistence(m)
            | AppError::Authentication(m)
            | AppError::Authorization(m)
            | AppError::InternalServer(m)
            | AppError::InternalConfiguration(m) => m,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResourcePersistence(_) => StatusCode::CONFLICT,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::InternalServer(_) | AppError::InternalConfiguration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON payload carrying the error kind, message and status code
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.kind(),
            "message": self.message(),
            "statusCode": self.status_code().as_u16(),
        })
    }

    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }
        (status, Json(self.to_json()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(AppError::bad_request().status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ResourcePersistence("taken".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Authentication("no".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Authorization("no".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InternalServer("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InternalConfiguration("missing variant".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_json_payload() {
        let err =
            AppError::ResourcePersistence("The provided brand name is already taken".to_string());
        let payload = err.to_json();

        assert_eq!(payload["error"], "ResourcePersistenceError");
        assert_eq!(payload["message"], "The provided brand name is already taken");
        assert_eq!(payload["statusCode"], 409);
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::bad_request().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
