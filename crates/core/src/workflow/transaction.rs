//! Transaction lifecycle.
//!
//! Validates transitions on a single transaction and describes them as a
//! [`TransactionAction`]. Nothing here touches the store; the caller applies
//! the action once every precondition of the command has passed.

use chrono::{DateTime, Utc};
use finplat_shared::{Amount, ApprovalId, WalletAddress};

use crate::workflow::error::{EntityKind, WorkflowError};
use crate::workflow::store::{NewTransaction, Tables};
use crate::workflow::types::{Transaction, TransactionStatus};
use crate::workflow::validation::{self, InputLimits};

/// A validated change to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAction {
    /// Attach an approval. Status stays Pending.
    LinkApproval {
        /// The approval being attached.
        approval_id: ApprovalId,
    },
    /// Record the linked approval's decision.
    ApplyApprovalResult {
        /// Active if approved, Rejected otherwise.
        new_status: TransactionStatus,
    },
    /// Settle an Active transaction.
    Complete {
        /// Always Completed.
        new_status: TransactionStatus,
        /// Settlement time, recorded on the transaction.
        completed_at: DateTime<Utc>,
    },
}

impl TransactionAction {
    /// Status the transaction will have after the action, if it changes.
    #[must_use]
    pub fn new_status(&self) -> Option<TransactionStatus> {
        match self {
            Self::LinkApproval { .. } => None,
            Self::ApplyApprovalResult { new_status } | Self::Complete { new_status, .. } => {
                Some(*new_status)
            }
        }
    }

    /// Writes the action into `transaction`.
    pub fn apply(&self, transaction: &mut Transaction) {
        match self {
            Self::LinkApproval { approval_id } => transaction.approval_id = Some(*approval_id),
            Self::ApplyApprovalResult { new_status } => transaction.status = *new_status,
            Self::Complete {
                new_status,
                completed_at,
            } => {
                transaction.status = *new_status;
                transaction.completed_at = Some(*completed_at);
            }
        }
    }
}

/// Stateless validator for transaction transitions.
pub struct TransactionLifecycle;

impl TransactionLifecycle {
    /// Validates the fields of a new transaction sent by `from`.
    ///
    /// Both parties must be registered and active; the sender's status is
    /// already enforced by the policy, so only the receiver is checked here.
    pub fn create(
        tables: &Tables,
        limits: &InputLimits,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: Amount,
        description: &str,
    ) -> Result<NewTransaction, WorkflowError> {
        let amount = validation::amount(amount)?;
        let description = limits.description(description)?;
        validation::distinct_parties(from, to)?;

        let receiver = tables.require_user(to)?;
        if !receiver.is_active {
            return Err(WorkflowError::invalid_input(
                "to",
                format!("receiver {} is not an active user", to.abbreviated()),
            ));
        }

        Ok(NewTransaction {
            from: from.clone(),
            to: to.clone(),
            amount,
            description,
        })
    }

    /// Attach `approval_id` to a transaction that has no approval yet.
    ///
    /// # Returns
    /// * `Err(AlreadyLinked)` if an approval is already attached, whatever the status
    /// * `Err(InvalidTransition)` if the transaction is not Pending
    pub fn link_approval(
        transaction: &Transaction,
        approval_id: ApprovalId,
    ) -> Result<TransactionAction, WorkflowError> {
        if let Some(existing) = transaction.approval_id {
            return Err(WorkflowError::AlreadyLinked {
                transaction_id: transaction.id,
                approval_id: existing,
            });
        }
        require_status(transaction, TransactionStatus::Pending, "link an approval to")?;
        Ok(TransactionAction::LinkApproval { approval_id })
    }

    /// Record the decision of approval `approval_id`.
    ///
    /// # Returns
    /// * `Err(LinkMismatch)` if the transaction is not linked to that approval
    /// * `Err(InvalidTransition)` if the transaction is not Pending
    pub fn apply_approval_result(
        transaction: &Transaction,
        approval_id: ApprovalId,
        approved: bool,
    ) -> Result<TransactionAction, WorkflowError> {
        if transaction.approval_id != Some(approval_id) {
            return Err(WorkflowError::LinkMismatch {
                transaction_id: transaction.id,
                approval_id,
            });
        }
        require_status(transaction, TransactionStatus::Pending, "apply an approval to")?;

        let new_status = if approved {
            TransactionStatus::Active
        } else {
            TransactionStatus::Rejected
        };
        Ok(TransactionAction::ApplyApprovalResult { new_status })
    }

    /// Complete an Active transaction. Sender checks belong to the policy.
    pub fn complete(transaction: &Transaction) -> Result<TransactionAction, WorkflowError> {
        require_status(transaction, TransactionStatus::Active, "complete")?;
        Ok(TransactionAction::Complete {
            new_status: TransactionStatus::Completed,
            completed_at: Utc::now(),
        })
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Active (approval approved)
    /// - Pending → Rejected (approval rejected)
    /// - Active → Completed (complete)
    #[must_use]
    pub fn is_valid_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
        matches!(
            (from, to),
            (
                TransactionStatus::Pending,
                TransactionStatus::Active | TransactionStatus::Rejected
            ) | (TransactionStatus::Active, TransactionStatus::Completed)
        )
    }
}

fn require_status(
    transaction: &Transaction,
    expected: TransactionStatus,
    action: &'static str,
) -> Result<(), WorkflowError> {
    if transaction.status == expected {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            entity: EntityKind::Transaction,
            id: transaction.id.get(),
            status: transaction.status.as_str(),
            action,
        })
    }
}
