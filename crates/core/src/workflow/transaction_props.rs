//! Property-based tests for TransactionLifecycle.

use chrono::Utc;
use finplat_shared::{ApprovalId, TransactionId, WalletAddress};
use proptest::prelude::*;

use crate::workflow::error::{ErrorKind, WorkflowError};
use crate::workflow::transaction::TransactionLifecycle;
use crate::workflow::types::{Transaction, TransactionStatus};

fn arb_status() -> impl Strategy<Value = TransactionStatus> {
    prop_oneof![
        Just(TransactionStatus::Pending),
        Just(TransactionStatus::Active),
        Just(TransactionStatus::Completed),
        Just(TransactionStatus::Rejected),
    ]
}

fn arb_approval_id() -> impl Strategy<Value = Option<ApprovalId>> {
    prop_oneof![Just(None), (1u64..1000).prop_map(ApprovalId::new)]
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (1u64..1000, 1u128..u128::MAX, arb_status(), arb_approval_id()).prop_map(
        |(id, amount, status, approval_id)| Transaction {
            id: TransactionId::new(id).unwrap_or(TransactionId::FIRST),
            from: WalletAddress::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            to: WalletAddress::parse("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            amount,
            description: "Invoice".to_string(),
            status,
            approval_id,
            timestamp: Utc::now(),
            completed_at: (status == TransactionStatus::Completed).then(Utc::now),
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every action a lifecycle call hands out is a valid transition.
    #[test]
    fn prop_actions_follow_transition_table(
        tx in arb_transaction(),
        candidate in 1u64..1000,
        approved in any::<bool>(),
    ) {
        let candidate = ApprovalId::new(candidate).unwrap();
        let results = [
            TransactionLifecycle::link_approval(&tx, candidate),
            TransactionLifecycle::apply_approval_result(&tx, candidate, approved),
            TransactionLifecycle::complete(&tx),
        ];
        for action in results.into_iter().flatten() {
            if let Some(to) = action.new_status() {
                prop_assert!(TransactionLifecycle::is_valid_transition(tx.status, to));
            }
        }
    }

    /// Linking fails with AlreadyLinked whenever an approval is attached.
    #[test]
    fn prop_link_with_existing_approval_is_already_linked(
        tx in arb_transaction(),
        candidate in 1u64..1000,
    ) {
        prop_assume!(tx.approval_id.is_some());
        let err = TransactionLifecycle::link_approval(&tx, ApprovalId::new(candidate).unwrap())
            .unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::AlreadyLinked);
    }

    /// Terminal transactions get no action from any lifecycle call, and
    /// each refusal names the right error kind.
    #[test]
    fn prop_terminal_states_are_final(
        tx in arb_transaction(),
        candidate in 1u64..1000,
        approved in any::<bool>(),
    ) {
        prop_assume!(tx.status.is_terminal());
        let candidate = ApprovalId::new(candidate).unwrap();
        let linked = tx.approval_id.unwrap_or(candidate);

        let link = TransactionLifecycle::link_approval(&tx, candidate).unwrap_err();
        let expected_link = if tx.approval_id.is_some() {
            ErrorKind::AlreadyLinked
        } else {
            ErrorKind::InvalidState
        };
        prop_assert_eq!(link.kind(), expected_link);

        let result = TransactionLifecycle::apply_approval_result(&tx, linked, approved).unwrap_err();
        prop_assert_eq!(result.kind(), ErrorKind::InvalidState);

        let complete = TransactionLifecycle::complete(&tx).unwrap_err();
        prop_assert_eq!(complete.kind(), ErrorKind::InvalidState);
    }

    /// Completion succeeds exactly from Active.
    #[test]
    fn prop_complete_only_from_active(tx in arb_transaction()) {
        let result = TransactionLifecycle::complete(&tx);
        if tx.status == TransactionStatus::Active {
            prop_assert_eq!(
                result.unwrap().new_status(),
                Some(TransactionStatus::Completed)
            );
        } else {
            let is_invalid_transition =
                matches!(result, Err(WorkflowError::InvalidTransition { .. }));
            prop_assert!(is_invalid_transition);
        }
    }

    /// The approval result maps approved to Active and rejected to Rejected.
    #[test]
    fn prop_approval_result_mapping(approval in 1u64..1000, approved in any::<bool>()) {
        let approval = ApprovalId::new(approval).unwrap();
        let tx = Transaction {
            id: TransactionId::FIRST,
            from: WalletAddress::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            to: WalletAddress::parse("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            amount: 1,
            description: "x".to_string(),
            status: TransactionStatus::Pending,
            approval_id: Some(approval),
            timestamp: Utc::now(),
            completed_at: None,
        };
        let expected = if approved {
            TransactionStatus::Active
        } else {
            TransactionStatus::Rejected
        };
        let action = TransactionLifecycle::apply_approval_result(&tx, approval, approved).unwrap();
        prop_assert_eq!(action.new_status(), Some(expected));
    }
}
