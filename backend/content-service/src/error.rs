/// Error types for Content Service
///
/// Adapter errors (store, cache, bus) are wrapped into this taxonomy at the
/// service boundary. Display text never carries raw adapter messages; those are
/// logged where the error is wrapped.
use crate::models::FieldError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

/// Result type for content-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Caller-supplied data fails a precondition
    InvalidInput(String),

    /// No matching record
    NotFound,

    /// Duplicate natural key on create
    AlreadyExists,

    /// Persistent store failed
    RepositoryFailed,

    /// Cache write failed after the store write succeeded
    CacheSetFailed,

    /// Cache read failed
    CacheGetFailed,

    /// Cache delete failed after the store delete succeeded
    CacheDelFailed,

    /// Operation deadline exceeded
    Timeout,

    /// Logic-level failure (both read arms failed, submission failed)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound => write!(f, "Not found"),
            AppError::AlreadyExists => write!(f, "Already exists"),
            AppError::RepositoryFailed => write!(f, "Repository operation failed"),
            AppError::CacheSetFailed => write!(f, "Cache set failed"),
            AppError::CacheGetFailed => write!(f, "Cache get failed"),
            AppError::CacheDelFailed => write!(f, "Cache delete failed"),
            AppError::Timeout => write!(f, "Operation timed out"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyExists => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::RepositoryFailed
            | AppError::CacheSetFailed
            | AppError::CacheGetFailed
            | AppError::CacheDelFailed
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<resilience::TimeoutError> for AppError {
    fn from(_: resilience::TimeoutError) -> Self {
        AppError::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::CacheDelFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_field_error_becomes_invalid_input() {
        let err: AppError = FieldError::UnknownField("likes".into()).into();
        assert_eq!(err, AppError::InvalidInput("unknown field: likes".into()));
    }
}
