//! Core error type
//!
//! Every public core operation returns `Result<_, CoreError>`. Variants map
//! 1:1 onto the error kinds a caller needs to branch on (see the design
//! doc's error handling table); `IntoResponse` lets API handlers propagate
//! a `CoreError` with `?` and get back a sensible JSON body.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: rust_decimal::Decimal,
        required: rust_decimal::Decimal,
    },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("contention timeout: {0}")]
    ContentionTimeout(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CoreError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            CoreError::InsufficientFunds { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS")
            }
            CoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            CoreError::ContentionTimeout(_) => (StatusCode::REQUEST_TIMEOUT, "CONTENTION_TIMEOUT"),
            CoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        if matches!(self, CoreError::Database(_)) {
            tracing::error!(error = %self, "core operation failed");
        } else {
            tracing::warn!(error = %self, "core operation rejected");
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
