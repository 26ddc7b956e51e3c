//! Approval lifecycle.
//!
//! An approval is requested against a Pending transaction and processed
//! exactly once. Processing also decides the linked transaction, so both
//! halves are planned against a shared borrow of the tables and only then
//! committed under the same write lock.

use chrono::{DateTime, Utc};
use finplat_shared::{ApprovalId, TransactionId, WalletAddress};

use crate::workflow::error::{EntityKind, WorkflowError};
use crate::workflow::policy::{Action, Actor, AuthorizationPolicy};
use crate::workflow::store::{NewApproval, Tables};
use crate::workflow::transaction::{TransactionAction, TransactionLifecycle};
use crate::workflow::types::{Approval, ApprovalStatus, Transaction};
use crate::workflow::validation::InputLimits;

/// A validated decision on a pending approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalAction {
    /// Approved or Rejected.
    pub new_status: ApprovalStatus,
    /// Who decided.
    pub approver: WalletAddress,
    /// Optional note from the approver.
    pub approver_reason: Option<String>,
    /// When the decision was made.
    pub processed_at: DateTime<Utc>,
}

impl ApprovalAction {
    /// Writes the decision into `approval`.
    pub fn apply(&self, approval: &mut Approval) {
        approval.status = self.new_status;
        approval.approver = Some(self.approver.clone());
        approval.approver_reason.clone_from(&self.approver_reason);
        approval.processed_at = Some(self.processed_at);
    }
}

/// Everything needed to commit an approval request.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    approval: NewApproval,
    link: TransactionAction,
}

/// Everything needed to commit an approval decision.
#[derive(Debug, Clone)]
pub struct ProcessPlan {
    approval_id: ApprovalId,
    transaction_id: TransactionId,
    decision: ApprovalAction,
    result: TransactionAction,
}

/// Stateless planner and committer for approval transitions.
pub struct ApprovalLifecycle;

impl ApprovalLifecycle {
    /// Validates a request for approval of `transaction_id`.
    ///
    /// Checks, in order: the transaction exists, the actor may request, the
    /// reason is valid, the transaction has no approval and is Pending.
    pub fn plan_request(
        tables: &Tables,
        limits: &InputLimits,
        actor: &Actor<'_>,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<RequestPlan, WorkflowError> {
        let transaction = tables.require_transaction(transaction_id)?;
        AuthorizationPolicy::authorize(actor, &Action::RequestApproval { transaction })?;
        let reason = limits.reason(reason)?;
        let link = TransactionLifecycle::link_approval(transaction, tables.next_approval_id())?;

        Ok(RequestPlan {
            approval: NewApproval {
                transaction_id,
                requester: actor.address.clone(),
                reason,
            },
            link,
        })
    }

    /// Creates the approval and links it to its transaction.
    pub fn commit_request(
        tables: &mut Tables,
        plan: RequestPlan,
        now: DateTime<Utc>,
    ) -> Result<(Approval, Transaction), WorkflowError> {
        let transaction_id = plan.approval.transaction_id;
        let approval = tables.create_approval(plan.approval, now)?;
        let transaction = tables
            .update_transaction(transaction_id, |t| plan.link.apply(t))?
            .clone();
        Ok((approval, transaction))
    }

    /// Validates a decision on approval `approval_id`.
    ///
    /// Checks, in order: the actor may process approvals, the approval exists
    /// and is Pending, the note is valid, the linked transaction accepts the
    /// result.
    pub fn plan_process(
        tables: &Tables,
        limits: &InputLimits,
        actor: &Actor<'_>,
        approval_id: ApprovalId,
        approved: bool,
        note: Option<&str>,
    ) -> Result<ProcessPlan, WorkflowError> {
        AuthorizationPolicy::authorize(actor, &Action::ProcessApproval)?;

        let approval = tables.require_approval(approval_id)?;
        if approval.status.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                entity: EntityKind::Approval,
                id: approval_id.get(),
                status: approval.status.as_str(),
                action: "process",
            });
        }
        let approver_reason = limits.approver_note(note)?;

        let transaction = tables.require_transaction(approval.transaction_id)?;
        let result = TransactionLifecycle::apply_approval_result(transaction, approval_id, approved)?;

        Ok(ProcessPlan {
            approval_id,
            transaction_id: transaction.id,
            decision: ApprovalAction {
                new_status: if approved {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::Rejected
                },
                approver: actor.address.clone(),
                approver_reason,
                processed_at: Utc::now(),
            },
            result,
        })
    }

    /// Records the decision on both the approval and its transaction.
    pub fn commit_process(
        tables: &mut Tables,
        plan: ProcessPlan,
    ) -> Result<(Approval, Transaction), WorkflowError> {
        let approval = tables
            .update_approval(plan.approval_id, |a| plan.decision.apply(a))?
            .clone();
        let transaction = tables
            .update_transaction(plan.transaction_id, |t| plan.result.apply(t))?
            .clone();
        Ok((approval, transaction))
    }

    /// Check if an approval status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: ApprovalStatus, to: ApprovalStatus) -> bool {
        matches!(
            (from, to),
            (
                ApprovalStatus::Pending,
                ApprovalStatus::Approved | ApprovalStatus::Rejected
            )
        )
    }
}
