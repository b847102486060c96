//! HTTP error handling.
//!
//! Maps domain failures onto HTTP status codes and a stable JSON error body.

use crate::error::PlannerError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// Error returned by API handlers
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

/// JSON body every error response carries
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    /// 400 with a caller-supplied message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    /// 404 with a caller-supplied message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    /// 500 with a generic message; the detail goes to the log only
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl From<PlannerError> for AppError {
    fn from(error: PlannerError) -> Self {
        let (status, code) = match &error {
            PlannerError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            PlannerError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            PlannerError::InvalidTransition { .. } => {
                (StatusCode::BAD_REQUEST, "invalid_transition")
            },
            PlannerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            PlannerError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = %error, "unhandled error in handler");
        Self::internal("Internal server error")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "server error");
        }
        (
            self.status,
            Json(ErrorBody {
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}
