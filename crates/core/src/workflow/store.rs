//! Entity store for users, transactions and approvals.
//!
//! All three tables live behind one `RwLock`. Writers hold the lock for the
//! whole command, so commands are applied one at a time in a global order and
//! readers only ever see complete commits.
//!
//! Write closures must validate everything before they mutate anything: the
//! store does not roll back a closure that fails halfway.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use finplat_shared::{Amount, ApprovalId, TransactionId, UserId, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::workflow::error::{EntityKind, WorkflowError};
use crate::workflow::types::{
    Approval, ApprovalStatus, ApprovalType, Transaction, TransactionStatus, User, UserRole,
};

/// Fields of a user about to be registered.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Identity key.
    pub wallet_address: WalletAddress,
    /// Validated display name.
    pub name: String,
    /// Validated e-mail.
    pub email: String,
    /// Initial role.
    pub role: UserRole,
}

/// Fields of a transaction about to be created.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Sender.
    pub from: WalletAddress,
    /// Receiver.
    pub to: WalletAddress,
    /// Amount, > 0.
    pub amount: Amount,
    /// Validated description.
    pub description: String,
}

/// Fields of an approval about to be requested.
#[derive(Debug, Clone)]
pub struct NewApproval {
    /// The transaction under review.
    pub transaction_id: TransactionId,
    /// Who asked.
    pub requester: WalletAddress,
    /// Validated reason.
    pub reason: String,
}

/// The tables and id counters guarded by the store lock.
#[derive(Debug, Clone)]
pub struct Tables {
    users: BTreeMap<UserId, User>,
    users_by_address: HashMap<WalletAddress, UserId>,
    transactions: BTreeMap<TransactionId, Transaction>,
    transactions_by_party: HashMap<WalletAddress, Vec<TransactionId>>,
    approvals: BTreeMap<ApprovalId, Approval>,
    next_user_id: UserId,
    next_transaction_id: TransactionId,
    next_approval_id: ApprovalId,
    last_event_sequence: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            users_by_address: HashMap::new(),
            transactions: BTreeMap::new(),
            transactions_by_party: HashMap::new(),
            approvals: BTreeMap::new(),
            next_user_id: UserId::FIRST,
            next_transaction_id: TransactionId::FIRST,
            next_approval_id: ApprovalId::FIRST,
            last_event_sequence: 0,
        }
    }
}

impl Tables {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a user, assigning the next id.
    pub fn create_user(&mut self, new: NewUser, now: DateTime<Utc>) -> Result<User, WorkflowError> {
        if self.users_by_address.contains_key(&new.wallet_address) {
            return Err(WorkflowError::AlreadyExists(new.wallet_address));
        }

        let id = self.next_user_id;
        self.next_user_id = id.next();

        let user = User {
            id,
            wallet_address: new.wallet_address,
            name: new.name,
            email: new.email,
            role: new.role,
            is_active: true,
            created_at: now,
        };
        self.users_by_address.insert(user.wallet_address.clone(), id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    /// Looks up a user by id.
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Looks up a user by wallet address.
    pub fn user_by_address(&self, address: &WalletAddress) -> Option<&User> {
        self.users_by_address
            .get(address)
            .and_then(|id| self.users.get(id))
    }

    /// Looks up a user by wallet address, failing with `NotFound`.
    pub fn require_user(&self, address: &WalletAddress) -> Result<&User, WorkflowError> {
        self.user_by_address(address)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::User, address))
    }

    /// All users in registration order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of registered users (active or not).
    pub fn user_count(&self) -> u64 {
        self.users.len() as u64
    }

    /// Applies `mutate` to a user. Identity fields are restored afterwards.
    pub fn update_user(
        &mut self,
        id: UserId,
        mutate: impl FnOnce(&mut User),
    ) -> Result<&User, WorkflowError> {
        let user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::User, id))?;
        let (wallet, created_at) = (user.wallet_address.clone(), user.created_at);
        mutate(user);
        user.id = id;
        user.wallet_address = wallet;
        user.created_at = created_at;
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Inserts a Pending transaction with no approval, assigning the next id.
    pub fn create_transaction(&mut self, new: NewTransaction, now: DateTime<Utc>) -> Transaction {
        let id = self.next_transaction_id;
        self.next_transaction_id = id.next();

        let transaction = Transaction {
            id,
            from: new.from,
            to: new.to,
            amount: new.amount,
            description: new.description,
            status: TransactionStatus::Pending,
            approval_id: None,
            timestamp: now,
            completed_at: None,
        };
        self.index_parties(&transaction);
        self.transactions.insert(id, transaction.clone());
        transaction
    }

    /// Looks up a transaction by id.
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    /// Looks up a transaction by id, failing with `NotFound`.
    pub fn require_transaction(&self, id: TransactionId) -> Result<&Transaction, WorkflowError> {
        self.transaction(id)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Transaction, id))
    }

    /// All transactions, oldest first.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Transactions where `address` is sender or receiver, oldest first.
    pub fn transactions_for(&self, address: &WalletAddress) -> Vec<&Transaction> {
        self.transactions_by_party
            .get(address)
            .map(|ids| ids.iter().filter_map(|id| self.transactions.get(id)).collect())
            .unwrap_or_default()
    }

    /// The `count` newest transactions, newest first.
    pub fn recent_transactions(&self, count: usize) -> Vec<&Transaction> {
        self.transactions.values().rev().take(count).collect()
    }

    /// Number of transactions.
    pub fn transaction_count(&self) -> u64 {
        self.transactions.len() as u64
    }

    /// Applies `mutate` to a transaction. Identity fields are restored afterwards.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        mutate: impl FnOnce(&mut Transaction),
    ) -> Result<&Transaction, WorkflowError> {
        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Transaction, id))?;
        let (from, to, timestamp) = (
            transaction.from.clone(),
            transaction.to.clone(),
            transaction.timestamp,
        );
        mutate(transaction);
        transaction.id = id;
        transaction.from = from;
        transaction.to = to;
        transaction.timestamp = timestamp;
        Ok(transaction)
    }

    fn index_parties(&mut self, transaction: &Transaction) {
        self.transactions_by_party
            .entry(transaction.from.clone())
            .or_default()
            .push(transaction.id);
        self.transactions_by_party
            .entry(transaction.to.clone())
            .or_default()
            .push(transaction.id);
    }

    // ------------------------------------------------------------------
    // Approvals
    // ------------------------------------------------------------------

    /// The id the next approval will receive.
    pub fn next_approval_id(&self) -> ApprovalId {
        self.next_approval_id
    }

    /// Inserts a Pending transaction approval, assigning the next id.
    ///
    /// The referenced transaction must exist.
    pub fn create_approval(
        &mut self,
        new: NewApproval,
        now: DateTime<Utc>,
    ) -> Result<Approval, WorkflowError> {
        self.require_transaction(new.transaction_id)?;

        let id = self.next_approval_id;
        self.next_approval_id = id.next();

        let approval = Approval {
            id,
            transaction_id: new.transaction_id,
            requester: new.requester,
            approver: None,
            approval_type: ApprovalType::Transaction,
            status: ApprovalStatus::Pending,
            reason: new.reason,
            approver_reason: None,
            timestamp: now,
            processed_at: None,
        };
        self.approvals.insert(id, approval.clone());
        Ok(approval)
    }

    /// Looks up an approval by id.
    pub fn approval(&self, id: ApprovalId) -> Option<&Approval> {
        self.approvals.get(&id)
    }

    /// Looks up an approval by id, failing with `NotFound`.
    pub fn require_approval(&self, id: ApprovalId) -> Result<&Approval, WorkflowError> {
        self.approval(id)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Approval, id))
    }

    /// All approvals, oldest first.
    pub fn approvals(&self) -> impl Iterator<Item = &Approval> {
        self.approvals.values()
    }

    /// Approvals still waiting for a decision, oldest first.
    pub fn pending_approvals(&self) -> impl Iterator<Item = &Approval> {
        self.approvals
            .values()
            .filter(|a| a.status == ApprovalStatus::Pending)
    }

    /// Number of approvals.
    pub fn approval_count(&self) -> u64 {
        self.approvals.len() as u64
    }

    /// Applies `mutate` to an approval. Identity fields are restored afterwards.
    pub fn update_approval(
        &mut self,
        id: ApprovalId,
        mutate: impl FnOnce(&mut Approval),
    ) -> Result<&Approval, WorkflowError> {
        let approval = self
            .approvals
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Approval, id))?;
        let (transaction_id, requester, timestamp) = (
            approval.transaction_id,
            approval.requester.clone(),
            approval.timestamp,
        );
        mutate(approval);
        approval.id = id;
        approval.transaction_id = transaction_id;
        approval.requester = requester;
        approval.timestamp = timestamp;
        Ok(approval)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Sequence number of the last event published against these tables.
    pub fn last_event_sequence(&self) -> u64 {
        self.last_event_sequence
    }

    /// Records the sequence number of the latest published event.
    pub fn set_last_event_sequence(&mut self, sequence: u64) {
        self.last_event_sequence = self.last_event_sequence.max(sequence);
    }
}

/// Serializable image of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Users in id order.
    pub users: Vec<User>,
    /// Transactions in id order.
    pub transactions: Vec<Transaction>,
    /// Approvals in id order.
    pub approvals: Vec<Approval>,
    /// Next user id to assign.
    pub next_user_id: UserId,
    /// Next transaction id to assign.
    pub next_transaction_id: TransactionId,
    /// Next approval id to assign.
    pub next_approval_id: ApprovalId,
    /// Last event sequence number handed out.
    #[serde(default)]
    pub last_event_sequence: u64,
}

impl StoreSnapshot {
    /// Rebuilds tables from the snapshot, checking every store invariant.
    fn into_tables(self) -> Result<Tables, WorkflowError> {
        let mut tables = Tables {
            next_user_id: self.next_user_id,
            next_transaction_id: self.next_transaction_id,
            next_approval_id: self.next_approval_id,
            last_event_sequence: self.last_event_sequence,
            ..Tables::default()
        };

        for user in self.users {
            if user.id >= tables.next_user_id {
                return Err(corrupt(format!("user id {} is not below the counter", user.id)));
            }
            if tables.users_by_address.contains_key(&user.wallet_address) {
                return Err(corrupt(format!(
                    "duplicate wallet address {}",
                    user.wallet_address
                )));
            }
            tables
                .users_by_address
                .insert(user.wallet_address.clone(), user.id);
            if tables.users.insert(user.id, user).is_some() {
                return Err(corrupt("duplicate user id".to_string()));
            }
        }

        for transaction in self.transactions {
            if transaction.id >= tables.next_transaction_id {
                return Err(corrupt(format!(
                    "transaction id {} is not below the counter",
                    transaction.id
                )));
            }
            if transaction.amount == 0 {
                return Err(corrupt(format!("transaction {} has zero amount", transaction.id)));
            }
            let completed = transaction.status == TransactionStatus::Completed;
            if completed != transaction.completed_at.is_some() {
                return Err(corrupt(format!(
                    "transaction {} is {} but completion time is {}",
                    transaction.id,
                    transaction.status,
                    if transaction.completed_at.is_some() { "set" } else { "missing" }
                )));
            }
            if tables.transactions.contains_key(&transaction.id) {
                return Err(corrupt(format!("duplicate transaction id {}", transaction.id)));
            }
            tables.index_parties(&transaction);
            tables.transactions.insert(transaction.id, transaction);
        }

        let mut linked = HashSet::new();
        for approval in self.approvals {
            if approval.id >= tables.next_approval_id {
                return Err(corrupt(format!(
                    "approval id {} is not below the counter",
                    approval.id
                )));
            }
            let transaction = tables.transaction(approval.transaction_id).ok_or_else(|| {
                corrupt(format!(
                    "approval {} references missing transaction {}",
                    approval.id, approval.transaction_id
                ))
            })?;
            if transaction.approval_id != Some(approval.id) {
                return Err(corrupt(format!(
                    "transaction {} is not linked to approval {}",
                    transaction.id, approval.id
                )));
            }
            if !consistent(approval.status, transaction.status) {
                return Err(corrupt(format!(
                    "approval {} is {} but transaction {} is {}",
                    approval.id, approval.status, transaction.id, transaction.status
                )));
            }
            linked.insert(approval.transaction_id);
            if tables.approvals.insert(approval.id, approval).is_some() {
                return Err(corrupt("duplicate approval id".to_string()));
            }
        }

        if let Some(orphan) = tables
            .transactions
            .values()
            .find(|t| t.approval_id.is_some() && !linked.contains(&t.id))
        {
            return Err(corrupt(format!(
                "transaction {} links a missing approval",
                orphan.id
            )));
        }
        if let Some(unapproved) = tables
            .transactions
            .values()
            .find(|t| t.approval_id.is_none() && t.status != TransactionStatus::Pending)
        {
            return Err(corrupt(format!(
                "transaction {} left Pending without an approval",
                unapproved.id
            )));
        }

        Ok(tables)
    }
}

/// Pairs of approval/transaction status that a committed store can contain.
fn consistent(approval: ApprovalStatus, transaction: TransactionStatus) -> bool {
    matches!(
        (approval, transaction),
        (ApprovalStatus::Pending, TransactionStatus::Pending)
            | (
                ApprovalStatus::Approved,
                TransactionStatus::Active | TransactionStatus::Completed
            )
            | (ApprovalStatus::Rejected, TransactionStatus::Rejected)
    )
}

fn corrupt(reason: String) -> WorkflowError {
    WorkflowError::invalid_input("snapshot", reason)
}

/// Thread-safe owner of the tables.
#[derive(Debug, Default)]
pub struct EntityStore {
    tables: RwLock<Tables>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a store from a snapshot, rejecting inconsistent data.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, WorkflowError> {
        Ok(Self {
            tables: RwLock::new(snapshot.into_tables()?),
        })
    }

    /// Captures a consistent image of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.read(|t| StoreSnapshot {
            users: t.users.values().cloned().collect(),
            transactions: t.transactions.values().cloned().collect(),
            approvals: t.approvals.values().cloned().collect(),
            next_user_id: t.next_user_id,
            next_transaction_id: t.next_transaction_id,
            next_approval_id: t.next_approval_id,
            last_event_sequence: t.last_event_sequence,
        })
    }

    /// Runs `f` under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Runs `f` under the exclusive lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
