//! Error handling for the harvest inventory server
//!
//! Business-rule failures come from [`shared::DomainError`]; this module adds
//! the storage and request-layer failures and turns all of them into
//! consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Business rule errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Request errors
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a not-found domain error
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::Domain(DomainError::NotFound(what.into()))
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::InvalidState(_) | DomainError::ImmutableActivity(_) => {
                    StatusCode::CONFLICT
                }
                DomainError::InsufficientStock { .. }
                | DomainError::IncompleteClassification(_)
                | DomainError::VarietyMismatch { .. }
                | DomainError::CaliberMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::InvalidReference(_) | DomainError::InvalidInput { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            AppError::DuplicateEntry(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            AppError::Domain(DomainError::InvalidInput { field, message }) => ErrorDetail {
                code: "INVALID_INPUT".to_string(),
                message: message.clone(),
                field: Some(field.clone()),
            },
            AppError::Domain(err) => ErrorDetail::new(err.code(), err.to_string()),
            AppError::DuplicateEntry(field) => ErrorDetail {
                code: "DUPLICATE_ENTRY".to_string(),
                message: format!("A record with this {} already exists", field),
                field: Some(field.clone()),
            },
            AppError::Unauthorized(msg) => ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            AppError::DatabaseError(_) => {
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::Internal(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!(code = %detail.code, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Map a unique-constraint violation on `constraint` to a duplicate entry
pub fn map_unique_violation(err: sqlx::Error, constraint: &str, field: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.constraint() == Some(constraint) {
            return AppError::DuplicateEntry(field.to_string());
        }
    }
    AppError::DatabaseError(err)
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;
