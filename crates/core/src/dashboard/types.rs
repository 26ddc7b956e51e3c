//! Dashboard data types.

use finplat_shared::Amount;
use serde::{Deserialize, Serialize};

/// Dashboard metrics response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Entity counts.
    pub counts: EntityCounts,
    /// Approvals waiting for a decision.
    pub pending_approvals: PendingApprovals,
    /// Transactions per status.
    pub transactions_by_status: StatusBreakdown,
    /// Sum of all Completed transaction amounts.
    #[serde(with = "finplat_shared::types::amount")]
    pub completed_volume: Amount,
}

/// Entity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    /// Registered users, active or not.
    pub users: u64,
    /// Active users.
    pub active_users: u64,
    /// Transactions.
    pub transactions: u64,
    /// Approvals.
    pub approvals: u64,
}

/// Pending approvals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApprovals {
    /// Number of pending approvals.
    pub count: u64,
    /// Total amount of the transactions under review.
    #[serde(with = "finplat_shared::types::amount")]
    pub total_amount: Amount,
}

/// Transaction count per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    /// Pending.
    pub pending: u64,
    /// Active.
    pub active: u64,
    /// Completed.
    pub completed: u64,
    /// Rejected.
    pub rejected: u64,
}
