//! Application-wide error types.
//!
//! Domain crates convert their own errors into [`AppError`] at process
//! boundaries (startup, snapshot persistence). HTTP handlers use the richer
//! workflow errors directly.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Process-level error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// The caller's role or relationship does not permit the operation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// A referenced user, transaction or approval does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-bounds input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Duplicate registration or an approval already linked.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot file could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status equivalent of this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidState(_) | Self::Conflict(_) => 409,
            Self::Config(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is the caller's fault rather than the process's.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
