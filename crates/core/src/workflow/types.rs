//! Workflow domain types.
//!
//! Users, transactions and approvals, plus the status enums that drive the
//! two lifecycles. Numeric discriminants match the order used on the wire by
//! the dashboard (`Regular = 0`, `Pending = 0`, ...).

use chrono::{DateTime, Utc};
use finplat_shared::{Amount, ApprovalId, TransactionId, UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a registered user.
///
/// Roles are ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Can create transactions and request approval as a receiver.
    Regular = 0,
    /// Can request and process approvals for any transaction.
    Manager = 1,
    /// Full access including user management.
    Admin = 2,
}

impl UserRole {
    /// Parses a role from its name or its numeric index.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "regular" | "0" => Some(Self::Regular),
            "manager" | "1" => Some(Self::Manager),
            "admin" | "2" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Returns true for roles that may request and process any approval.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status.
///
/// Valid transitions:
/// - Pending → Active (linked approval approved)
/// - Pending → Rejected (linked approval rejected)
/// - Active → Completed (sender completes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, waiting for an approval decision.
    Pending = 0,
    /// Approved and awaiting completion by the sender.
    Active = 1,
    /// Settled by the sender (immutable).
    Completed = 2,
    /// Approval was refused (immutable).
    Rejected = 3,
}

impl TransactionStatus {
    /// Every status, in discriminant order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Active, Self::Completed, Self::Rejected];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval status. Pending is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for a Manager or Admin.
    Pending = 0,
    /// Approved; the linked transaction is Active.
    Approved = 1,
    /// Rejected; the linked transaction is Rejected.
    Rejected = 2,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true once the approval has been decided.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an approval is about. Only `Transaction` drives a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    /// Approval of a transaction.
    Transaction = 0,
    /// Approval of a role change.
    UserRole = 1,
    /// Approval of a configuration change.
    SystemConfig = 2,
}

/// A registered platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sequential id, assigned on registration.
    pub id: UserId,
    /// Identity key, unique across users.
    pub wallet_address: WalletAddress,
    /// Display name.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Current role.
    pub role: UserRole,
    /// False when the user has been disabled.
    pub is_active: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// A transfer request between two registered users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequential id.
    pub id: TransactionId,
    /// Sender and creator.
    pub from: WalletAddress,
    /// Receiver.
    pub to: WalletAddress,
    /// Amount in the smallest currency unit, always > 0.
    #[serde(with = "finplat_shared::types::amount")]
    pub amount: Amount,
    /// Free-text description.
    pub description: String,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Linked approval, once one has been requested. 0 on the wire when none.
    #[serde(with = "finplat_shared::types::id::zero_as_none")]
    pub approval_id: Option<ApprovalId>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Settlement time; set exactly when the status is Completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// An approval request attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Sequential id.
    pub id: ApprovalId,
    /// The transaction under review.
    pub transaction_id: TransactionId,
    /// Who asked for the approval.
    pub requester: WalletAddress,
    /// Who decided it; unset while pending and `""` on the wire.
    #[serde(with = "finplat_shared::types::address::empty_as_none")]
    pub approver: Option<WalletAddress>,
    /// Subject of the approval.
    pub approval_type: ApprovalType,
    /// Lifecycle status.
    pub status: ApprovalStatus,
    /// Requester's justification.
    pub reason: String,
    /// Approver's note, if one was given.
    pub approver_reason: Option<String>,
    /// Request time.
    pub timestamp: DateTime<Utc>,
    /// Decision time.
    pub processed_at: Option<DateTime<Utc>>,
}
