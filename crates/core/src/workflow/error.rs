//! Workflow error types.
//!
//! Every failure carries a closed [`ErrorKind`] so that callers branch on
//! data, never on message text.

use finplat_shared::{AppError, ApprovalId, TransactionId, WalletAddress};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A user, looked up by wallet address.
    User,
    /// A transaction, looked up by id.
    Transaction,
    /// An approval, looked up by id.
    Approval,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "User",
            Self::Transaction => "Transaction",
            Self::Approval => "Approval",
        })
    }
}

/// Closed set of failure categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown id or address.
    NotFound,
    /// Duplicate registration.
    AlreadyExists,
    /// Policy denial.
    Unauthorized,
    /// Empty, oversized or malformed field.
    InvalidInput,
    /// Action illegal for the entity's current state.
    InvalidState,
    /// Approval requested twice for the same transaction.
    AlreadyLinked,
}

impl ErrorKind {
    /// Returns the snake_case name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::Unauthorized => "unauthorized",
            Self::InvalidInput => "invalid_input",
            Self::InvalidState => "invalid_state",
            Self::AlreadyLinked => "already_linked",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Lookup by id or address found nothing.
    #[error("{entity} {key} not found")]
    NotFound {
        /// The kind of entity.
        entity: EntityKind,
        /// The id or address that was looked up.
        key: String,
    },

    /// The wallet already has a user record.
    #[error("User {0} is already registered")]
    AlreadyExists(WalletAddress),

    /// The policy denied the action.
    #[error("Not authorized to {action}: {reason}")]
    Unauthorized {
        /// The denied action.
        action: &'static str,
        /// Why it was denied.
        reason: &'static str,
    },

    /// A field failed validation.
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The entity's state does not allow the action.
    #[error("Cannot {action} {entity} {id} in status {status}")]
    InvalidTransition {
        /// The kind of entity.
        entity: EntityKind,
        /// Its id.
        id: u64,
        /// Its current status.
        status: &'static str,
        /// The attempted action.
        action: &'static str,
    },

    /// A decided approval's transaction is not linked back to it.
    #[error("Transaction {transaction_id} is not linked to approval {approval_id}")]
    LinkMismatch {
        /// The transaction.
        transaction_id: TransactionId,
        /// The approval being processed.
        approval_id: ApprovalId,
    },

    /// The change would leave the platform without an administrator.
    #[error("Cannot remove the last administrator {0}")]
    LastAdmin(WalletAddress),

    /// The transaction already has an approval.
    #[error("Transaction {transaction_id} already linked to approval {approval_id}")]
    AlreadyLinked {
        /// The transaction.
        transaction_id: TransactionId,
        /// Its existing approval.
        approval_id: ApprovalId,
    },
}

impl WorkflowError {
    /// Shorthand for a not-found error.
    pub fn not_found(entity: EntityKind, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for an invalid-input error.
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidTransition { .. } | Self::LinkMismatch { .. } | Self::LastAdmin(_) => {
                ErrorKind::InvalidState
            }
            Self::AlreadyLinked { .. } => ErrorKind::AlreadyLinked,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Unauthorized => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists | ErrorKind::InvalidState | ErrorKind::AlreadyLinked => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { entity, .. } => match entity {
                EntityKind::User => "USER_NOT_FOUND",
                EntityKind::Transaction => "TRANSACTION_NOT_FOUND",
                EntityKind::Approval => "APPROVAL_NOT_FOUND",
            },
            Self::AlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::LinkMismatch { .. } => "APPROVAL_LINK_MISMATCH",
            Self::LastAdmin(_) => "LAST_ADMIN",
            Self::AlreadyLinked { .. } => "APPROVAL_ALREADY_LINKED",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::AlreadyExists | ErrorKind::AlreadyLinked => Self::Conflict(message),
            ErrorKind::Unauthorized => Self::Forbidden(message),
            ErrorKind::InvalidInput => Self::Validation(message),
            ErrorKind::InvalidState => Self::InvalidState(message),
        }
    }
}
