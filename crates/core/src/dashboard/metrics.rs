//! Metric aggregation over the entity tables.

use crate::dashboard::types::{DashboardMetrics, EntityCounts, PendingApprovals, StatusBreakdown};
use crate::workflow::store::Tables;
use crate::workflow::types::TransactionStatus;

/// Aggregates dashboard metrics from a consistent view of the tables.
///
/// Amount sums saturate at `u128::MAX` rather than wrap.
#[must_use]
pub fn compute_metrics(tables: &Tables) -> DashboardMetrics {
    let mut by_status = StatusBreakdown::default();
    let mut completed_volume: u128 = 0;

    for transaction in tables.transactions() {
        match transaction.status {
            TransactionStatus::Pending => by_status.pending += 1,
            TransactionStatus::Active => by_status.active += 1,
            TransactionStatus::Completed => {
                by_status.completed += 1;
                completed_volume = completed_volume.saturating_add(transaction.amount);
            }
            TransactionStatus::Rejected => by_status.rejected += 1,
        }
    }

    let mut pending = PendingApprovals::default();
    for approval in tables.pending_approvals() {
        pending.count += 1;
        if let Some(transaction) = tables.transaction(approval.transaction_id) {
            pending.total_amount = pending.total_amount.saturating_add(transaction.amount);
        }
    }

    DashboardMetrics {
        counts: EntityCounts {
            users: tables.user_count(),
            active_users: tables.users().filter(|u| u.is_active).count() as u64,
            transactions: tables.transaction_count(),
            approvals: tables.approval_count(),
        },
        pending_approvals: pending,
        transactions_by_status: by_status,
        completed_volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::store::NewTransaction;
    use chrono::Utc;
    use finplat_shared::WalletAddress;

    fn tables_with(statuses: &[(TransactionStatus, u128)]) -> Tables {
        let mut tables = Tables::default();
        for (status, amount) in statuses {
            let tx = tables.create_transaction(
                NewTransaction {
                    from: WalletAddress::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8")
                        .unwrap(),
                    to: WalletAddress::parse("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc")
                        .unwrap(),
                    amount: *amount,
                    description: "Invoice".to_string(),
                },
                Utc::now(),
            );
            tables
                .update_transaction(tx.id, |t| t.status = *status)
                .unwrap();
        }
        tables
    }

    #[test]
    fn test_empty_store() {
        let metrics = compute_metrics(&Tables::default());
        assert_eq!(metrics.counts, EntityCounts::default());
        assert_eq!(metrics.completed_volume, 0);
        assert_eq!(metrics.pending_approvals.count, 0);
    }

    #[test]
    fn test_breakdown_and_volume() {
        let tables = tables_with(&[
            (TransactionStatus::Pending, 5),
            (TransactionStatus::Completed, 1000),
            (TransactionStatus::Completed, 250),
            (TransactionStatus::Rejected, 7),
        ]);
        let metrics = compute_metrics(&tables);

        assert_eq!(metrics.counts.transactions, 4);
        assert_eq!(
            metrics.transactions_by_status,
            StatusBreakdown {
                pending: 1,
                active: 0,
                completed: 2,
                rejected: 1,
            }
        );
        assert_eq!(metrics.completed_volume, 1250);
    }

    #[test]
    fn test_volume_saturates() {
        let tables = tables_with(&[
            (TransactionStatus::Completed, u128::MAX),
            (TransactionStatus::Completed, 1),
        ]);
        assert_eq!(compute_metrics(&tables).completed_volume, u128::MAX);
    }
}
