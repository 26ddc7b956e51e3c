//! Concurrent access tests for the workflow engine.
//!
//! These tests verify that:
//! - Concurrent commands receive unique, gapless ids
//! - Events are numbered in commit order with no gaps
//! - Readers never observe an approval decided while its transaction is not

use futures::future::join_all;
use std::sync::Arc;

use finplat_core::workflow::{
    ApprovalStatus, TransactionStatus, UserRole, WorkflowEngine, WorkflowEvent,
};
use finplat_shared::{WalletAddress, WorkflowConfig};

const OWNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const MANAGER: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";
const SENDER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const RECEIVER: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";

const WORKERS: u64 = 16;
const PER_WORKER: u64 = 25;

fn addr(s: &str) -> WalletAddress {
    WalletAddress::parse(s).expect("valid test address")
}

fn setup() -> Arc<WorkflowEngine> {
    let engine = WorkflowEngine::new(&WorkflowConfig {
        owner: Some(addr(OWNER)),
        event_history_capacity: 100_000,
        ..WorkflowConfig::default()
    });
    let owner = addr(OWNER);
    for (wallet, role) in [
        (MANAGER, UserRole::Manager),
        (SENDER, UserRole::Regular),
        (RECEIVER, UserRole::Regular),
    ] {
        engine
            .register_user(&owner, &addr(wallet), "Worker", "worker@company.com", role)
            .unwrap();
    }
    Arc::new(engine)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workflows_get_unique_ids() {
    let engine = setup();

    let tasks = (0..WORKERS).map(|worker| {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            let (manager, sender, receiver) = (addr(MANAGER), addr(SENDER), addr(RECEIVER));
            for i in 0..PER_WORKER {
                let tx = engine
                    .create_transaction(&sender, &receiver, u128::from(worker * 1000 + i + 1), "load")
                    .unwrap()
                    .value
                    .id;
                let approval = engine.request_approval(&receiver, tx, "ok").unwrap().value.id;
                let approve = i % 2 == 0;
                engine
                    .process_approval(&manager, approval, approve, None)
                    .unwrap();
                if approve {
                    engine.complete_transaction(&sender, tx).unwrap();
                }
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let total = WORKERS * PER_WORKER;
    let counts = engine.get_counts();
    assert_eq!(counts.transaction_count, total);
    assert_eq!(counts.approval_count, total);

    let mut ids: Vec<u64> = engine
        .get_all_transactions(&addr(OWNER))
        .unwrap()
        .iter()
        .map(|t| t.id.get())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=total).collect::<Vec<_>>());

    let metrics = engine.get_metrics();
    assert_eq!(
        metrics.transactions_by_status.completed,
        WORKERS * PER_WORKER.div_ceil(2)
    );
    assert_eq!(
        metrics.transactions_by_status.completed + metrics.transactions_by_status.rejected,
        total
    );

    let sequences: Vec<u64> = engine.events_since(0).iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=engine.last_event_sequence()).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_processed_approvals() {
    let engine = setup();
    let (manager, sender, receiver) = (addr(MANAGER), addr(SENDER), addr(RECEIVER));
    let mut approvals = Vec::new();
    for _ in 0..200 {
        let tx = engine
            .create_transaction(&sender, &receiver, 10, "batch")
            .unwrap()
            .value
            .id;
        approvals.push(engine.request_approval(&receiver, tx, "ok").unwrap().value.id);
    }

    let writer = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            for (i, approval) in approvals.into_iter().enumerate() {
                engine
                    .process_approval(&manager, approval, i % 3 != 0, None)
                    .unwrap();
            }
        })
    };

    let readers = (0..4).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            for _ in 0..200 {
                let snapshot = engine.snapshot();
                for approval in &snapshot.approvals {
                    let tx = snapshot
                        .transactions
                        .iter()
                        .find(|t| t.id == approval.transaction_id)
                        .unwrap();
                    let expected = match approval.status {
                        ApprovalStatus::Pending => TransactionStatus::Pending,
                        ApprovalStatus::Approved => TransactionStatus::Active,
                        ApprovalStatus::Rejected => TransactionStatus::Rejected,
                    };
                    assert_eq!(tx.status, expected);
                }
            }
        })
    });

    writer.await.unwrap();
    for result in join_all(readers).await {
        result.unwrap();
    }
    assert!(engine.get_pending_approvals().is_empty());
}

#[tokio::test]
async fn test_subscriber_sees_commit_order() {
    let engine = setup();
    let mut rx = engine.subscribe();
    let (manager, sender, receiver) = (addr(MANAGER), addr(SENDER), addr(RECEIVER));

    let tx = engine
        .create_transaction(&sender, &receiver, 1000, "stream")
        .unwrap()
        .value
        .id;
    let approval = engine.request_approval(&manager, tx, "ok").unwrap().value.id;
    engine.process_approval(&manager, approval, true, None).unwrap();

    let mut received = Vec::new();
    for _ in 0..4 {
        received.push(rx.recv().await.unwrap());
    }
    assert!(matches!(received[0].event, WorkflowEvent::TransactionCreated { .. }));
    assert!(matches!(received[1].event, WorkflowEvent::ApprovalRequested { .. }));
    assert!(matches!(
        received[2].event,
        WorkflowEvent::ApprovalProcessed {
            status: ApprovalStatus::Approved,
            ..
        }
    ));
    assert!(matches!(
        received[3].event,
        WorkflowEvent::TransactionStatusUpdated {
            new_status: TransactionStatus::Active,
            ..
        }
    ));
    assert!(received.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));
}
