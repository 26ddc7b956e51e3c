//! API error responses.
//!
//! Every failure is rendered as
//! `{ "error": <ERROR_CODE>, "kind": <kind>, "message": <text> }` so clients
//! branch on `kind` or `error`, never on the message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use finplat_core::WorkflowError;
use serde::Serialize;
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `TRANSACTION_NOT_FOUND`.
    pub error: &'static str,
    /// Error category: one of the workflow error kinds, or `unauthenticated`.
    pub kind: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// An error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// A malformed path, query or body field.
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        WorkflowError::invalid_input(field, reason).into()
    }

    /// The caller did not identify itself with a usable wallet address.
    pub fn unauthenticated(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorBody {
                error,
                kind: "unauthenticated",
                message: message.into(),
            },
        }
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ErrorBody {
                error: err.error_code(),
                kind: err.kind().as_str(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(error = %self.body.message, "Request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
