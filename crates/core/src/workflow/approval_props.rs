//! Property-based tests for ApprovalLifecycle.
//!
//! Random sequences of requests and decisions are replayed against one set of
//! tables; after every step each approval must agree with its transaction.

use chrono::Utc;
use finplat_shared::{ApprovalId, TransactionId, WalletAddress};
use proptest::prelude::*;

use crate::workflow::approval::ApprovalLifecycle;
use crate::workflow::error::WorkflowError;
use crate::workflow::policy::Actor;
use crate::workflow::store::{NewTransaction, NewUser, Tables};
use crate::workflow::types::{ApprovalStatus, TransactionStatus, UserRole};
use crate::workflow::validation::InputLimits;

const MANAGER: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";
const SENDER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const RECEIVER: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";

#[derive(Debug, Clone)]
enum Step {
    Request { who: usize, tx: u64 },
    Process { who: usize, approval: u64, approved: bool },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0usize..3, 1u64..5).prop_map(|(who, tx)| Step::Request { who, tx }),
        (0usize..3, 1u64..5, any::<bool>()).prop_map(|(who, approval, approved)| {
            Step::Process {
                who,
                approval,
                approved,
            }
        }),
    ]
}

fn addr(s: &str) -> WalletAddress {
    WalletAddress::parse(s).unwrap()
}

fn seeded() -> Tables {
    let mut tables = Tables::default();
    for (address, role) in [
        (MANAGER, UserRole::Manager),
        (SENDER, UserRole::Regular),
        (RECEIVER, UserRole::Regular),
    ] {
        tables
            .create_user(
                NewUser {
                    wallet_address: addr(address),
                    name: "User".to_string(),
                    email: "user@company.com".to_string(),
                    role,
                },
                Utc::now(),
            )
            .unwrap();
    }
    for _ in 0..3 {
        tables.create_transaction(
            NewTransaction {
                from: addr(SENDER),
                to: addr(RECEIVER),
                amount: 10,
                description: "Invoice".to_string(),
            },
            Utc::now(),
        );
    }
    tables
}

fn run(tables: &mut Tables, step: &Step) -> Result<(), WorkflowError> {
    let limits = InputLimits::default();
    let wallets = [addr(MANAGER), addr(SENDER), addr(RECEIVER)];
    match step {
        Step::Request { who, tx } => {
            let address = &wallets[*who];
            let plan = {
                let actor = Actor::new(address, tables.user_by_address(address), None);
                ApprovalLifecycle::plan_request(
                    tables,
                    &limits,
                    &actor,
                    TransactionId::new(*tx).unwrap(),
                    "ok",
                )?
            };
            ApprovalLifecycle::commit_request(tables, plan, Utc::now()).map(|_| ())
        }
        Step::Process {
            who,
            approval,
            approved,
        } => {
            let address = &wallets[*who];
            let plan = {
                let actor = Actor::new(address, tables.user_by_address(address), None);
                ApprovalLifecycle::plan_process(
                    tables,
                    &limits,
                    &actor,
                    ApprovalId::new(*approval).unwrap(),
                    *approved,
                    None,
                )?
            };
            ApprovalLifecycle::commit_process(tables, plan).map(|_| ())
        }
    }
}

fn assert_consistent(tables: &Tables) -> Result<(), TestCaseError> {
    for approval in tables.approvals() {
        let tx = tables.transaction(approval.transaction_id).unwrap();
        prop_assert_eq!(tx.approval_id, Some(approval.id));
        let expected = match approval.status {
            ApprovalStatus::Pending => TransactionStatus::Pending,
            ApprovalStatus::Approved => TransactionStatus::Active,
            ApprovalStatus::Rejected => TransactionStatus::Rejected,
        };
        prop_assert_eq!(tx.status, expected);
    }
    for tx in tables.transactions() {
        if tx.approval_id.is_none() {
            prop_assert_eq!(tx.status, TransactionStatus::Pending);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Approvals and transactions never end up in a mismatched pair, and a
    /// failed step changes nothing.
    #[test]
    fn prop_approval_and_transaction_stay_consistent(
        steps in prop::collection::vec(arb_step(), 1..30)
    ) {
        let mut tables = seeded();
        for step in &steps {
            let before = (
                tables.approvals().cloned().collect::<Vec<_>>(),
                tables.transactions().cloned().collect::<Vec<_>>(),
            );
            if run(&mut tables, step).is_err() {
                let after = (
                    tables.approvals().cloned().collect::<Vec<_>>(),
                    tables.transactions().cloned().collect::<Vec<_>>(),
                );
                prop_assert_eq!(before, after);
            }
            assert_consistent(&tables)?;
        }
    }

    /// Each transaction receives at most one approval.
    #[test]
    fn prop_one_approval_per_transaction(
        steps in prop::collection::vec(arb_step(), 1..30)
    ) {
        let mut tables = seeded();
        for step in &steps {
            let _ = run(&mut tables, step);
        }
        let mut linked: Vec<TransactionId> =
            tables.approvals().map(|a| a.transaction_id).collect();
        let total = linked.len();
        linked.sort();
        linked.dedup();
        prop_assert_eq!(linked.len(), total);
    }

    /// A decided approval never changes status again.
    #[test]
    fn prop_decisions_are_final(
        steps in prop::collection::vec(arb_step(), 1..30)
    ) {
        let mut tables = seeded();
        let mut decided: Vec<(ApprovalId, ApprovalStatus)> = Vec::new();
        for step in &steps {
            let _ = run(&mut tables, step);
            for (id, status) in &decided {
                prop_assert_eq!(tables.approval(*id).unwrap().status, *status);
            }
            decided = tables
                .approvals()
                .filter(|a| a.status.is_terminal())
                .map(|a| (a.id, a.status))
                .collect();
        }
    }
}
