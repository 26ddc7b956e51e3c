//! Workflow engine facade.
//!
//! Every command runs under the store's write lock in the same order:
//! authorization, precondition checks, mutation, event publication. A failed
//! command leaves the tables untouched and publishes nothing.

use chrono::Utc;
use finplat_shared::{Amount, ApprovalId, TransactionId, WalletAddress, WorkflowConfig};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::dashboard::{compute_metrics, DashboardMetrics};
use crate::workflow::approval::ApprovalLifecycle;
use crate::workflow::error::{ErrorKind, WorkflowError};
use crate::workflow::events::{EventBus, EventEnvelope, EventReplay, WorkflowEvent};
use crate::workflow::policy::{Action, Actor, AuthorizationPolicy};
use crate::workflow::store::{EntityStore, NewUser, StoreSnapshot, Tables};
use crate::workflow::transaction::TransactionLifecycle;
use crate::workflow::types::{Approval, Transaction, TransactionStatus, User, UserRole};
use crate::workflow::validation::InputLimits;

/// Result of a successful command: the affected entity and the events it emitted.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome<T> {
    /// The created or updated entity.
    #[serde(flatten)]
    pub value: T,
    /// Events published by the command, in order.
    pub events: Vec<EventEnvelope>,
}

/// Both halves of a processed approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalDecision {
    /// The decided approval.
    pub approval: Approval,
    /// Its transaction, now Active or Rejected.
    pub transaction: Transaction,
}

/// Entity counts, read under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Registered users.
    pub user_count: u64,
    /// Transactions.
    pub transaction_count: u64,
    /// Approvals.
    pub approval_count: u64,
}

type CommandResult<T> = Result<(T, Vec<WorkflowEvent>), WorkflowError>;

/// The public command/query surface.
#[derive(Debug)]
pub struct WorkflowEngine {
    store: EntityStore,
    events: EventBus,
    limits: InputLimits,
    owner: Option<WalletAddress>,
}

impl WorkflowEngine {
    /// Creates an engine over an empty store.
    #[must_use]
    pub fn new(config: &WorkflowConfig) -> Self {
        Self::with_store(config, EntityStore::new())
    }

    /// Creates an engine over an existing store. Event numbering resumes
    /// after the store's last recorded sequence.
    #[must_use]
    pub fn with_store(config: &WorkflowConfig, store: EntityStore) -> Self {
        let last_sequence = store.read(Tables::last_event_sequence);
        Self {
            store,
            events: EventBus::new(
                config.event_channel_capacity,
                config.event_history_capacity,
                last_sequence,
            ),
            limits: InputLimits::from(config),
            owner: config.owner.clone(),
        }
    }

    /// Restores an engine from a snapshot.
    pub fn from_snapshot(
        config: &WorkflowConfig,
        snapshot: StoreSnapshot,
    ) -> Result<Self, WorkflowError> {
        Ok(Self::with_store(config, EntityStore::from_snapshot(snapshot)?))
    }

    /// The configured owner wallet, if any.
    pub fn owner(&self) -> Option<&WalletAddress> {
        self.owner.as_ref()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Registers `wallet` with an explicit role. Admin only.
    pub fn register_user(
        &self,
        caller: &WalletAddress,
        wallet: &WalletAddress,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<CommandOutcome<User>, WorkflowError> {
        self.execute("register_user", caller, |tables| {
            AuthorizationPolicy::authorize(&self.actor(tables, caller), &Action::RegisterUser)?;
            let new = self.new_user(wallet, name, email, role)?;
            let user = tables.create_user(new, Utc::now())?;
            let event = WorkflowEvent::UserRegistered {
                user_id: user.id,
                wallet_address: user.wallet_address.clone(),
                role: user.role,
            };
            Ok((user, vec![event]))
        })
    }

    /// Registers the calling wallet as a Regular user.
    pub fn self_register(
        &self,
        caller: &WalletAddress,
        name: &str,
        email: &str,
    ) -> Result<CommandOutcome<User>, WorkflowError> {
        self.execute("self_register", caller, |tables| {
            AuthorizationPolicy::authorize(&self.actor(tables, caller), &Action::SelfRegister)?;
            let new = self.new_user(caller, name, email, UserRole::Regular)?;
            let user = tables.create_user(new, Utc::now())?;
            let event = WorkflowEvent::UserRegistered {
                user_id: user.id,
                wallet_address: user.wallet_address.clone(),
                role: user.role,
            };
            Ok((user, vec![event]))
        })
    }

    /// Changes a user's role. Admin only; refuses to remove the last admin.
    pub fn update_user_role(
        &self,
        caller: &WalletAddress,
        wallet: &WalletAddress,
        role: UserRole,
    ) -> Result<CommandOutcome<User>, WorkflowError> {
        self.execute("update_user_role", caller, |tables| {
            AuthorizationPolicy::authorize(&self.actor(tables, caller), &Action::UpdateUserRole)?;
            let target = tables.require_user(wallet)?;
            let old_role = target.role;
            if role != UserRole::Admin {
                self.guard_last_admin(tables, target)?;
            }

            let id = target.id;
            let user = tables.update_user(id, |u| u.role = role)?.clone();
            let event = WorkflowEvent::UserRoleUpdated {
                wallet_address: user.wallet_address.clone(),
                old_role,
                new_role: role,
            };
            Ok((user, vec![event]))
        })
    }

    /// Disables or re-enables a user. Admin only; refuses to disable the last admin.
    pub fn set_user_active(
        &self,
        caller: &WalletAddress,
        wallet: &WalletAddress,
        active: bool,
    ) -> Result<CommandOutcome<User>, WorkflowError> {
        self.execute("set_user_active", caller, |tables| {
            AuthorizationPolicy::authorize(&self.actor(tables, caller), &Action::SetUserActive)?;
            let target = tables.require_user(wallet)?;
            if !active {
                self.guard_last_admin(tables, target)?;
            }

            let id = target.id;
            let user = tables.update_user(id, |u| u.is_active = active)?.clone();
            let event = WorkflowEvent::UserStatusUpdated {
                wallet_address: user.wallet_address.clone(),
                is_active: active,
            };
            Ok((user, vec![event]))
        })
    }

    /// Creates a Pending transaction from the caller to `to`.
    pub fn create_transaction(
        &self,
        caller: &WalletAddress,
        to: &WalletAddress,
        amount: Amount,
        description: &str,
    ) -> Result<CommandOutcome<Transaction>, WorkflowError> {
        self.execute("create_transaction", caller, |tables| {
            AuthorizationPolicy::authorize(
                &self.actor(tables, caller),
                &Action::CreateTransaction { from: caller },
            )?;
            let new =
                TransactionLifecycle::create(tables, &self.limits, caller, to, amount, description)?;
            let transaction = tables.create_transaction(new, Utc::now());
            let event = WorkflowEvent::TransactionCreated {
                transaction_id: transaction.id,
                from: transaction.from.clone(),
                to: transaction.to.clone(),
                amount: transaction.amount,
            };
            Ok((transaction, vec![event]))
        })
    }

    /// Requests approval of a Pending transaction and links the new approval to it.
    pub fn request_approval(
        &self,
        caller: &WalletAddress,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<CommandOutcome<Approval>, WorkflowError> {
        self.execute("request_approval", caller, |tables| {
            let plan = ApprovalLifecycle::plan_request(
                tables,
                &self.limits,
                &self.actor(tables, caller),
                transaction_id,
                reason,
            )?;
            let (approval, _) = ApprovalLifecycle::commit_request(tables, plan, Utc::now())?;
            let event = WorkflowEvent::ApprovalRequested {
                approval_id: approval.id,
                transaction_id: approval.transaction_id,
                requester: approval.requester.clone(),
            };
            Ok((approval, vec![event]))
        })
    }

    /// Approves or rejects a pending approval and applies the result to its
    /// transaction. Both changes commit together.
    pub fn process_approval(
        &self,
        caller: &WalletAddress,
        approval_id: ApprovalId,
        approved: bool,
        note: Option<&str>,
    ) -> Result<CommandOutcome<ApprovalDecision>, WorkflowError> {
        self.execute("process_approval", caller, |tables| {
            let plan = ApprovalLifecycle::plan_process(
                tables,
                &self.limits,
                &self.actor(tables, caller),
                approval_id,
                approved,
                note,
            )?;
            let (approval, transaction) = ApprovalLifecycle::commit_process(tables, plan)?;
            let events = vec![
                WorkflowEvent::ApprovalProcessed {
                    approval_id: approval.id,
                    transaction_id: transaction.id,
                    approver: caller.clone(),
                    status: approval.status,
                },
                WorkflowEvent::TransactionStatusUpdated {
                    transaction_id: transaction.id,
                    old_status: TransactionStatus::Pending,
                    new_status: transaction.status,
                },
            ];
            Ok((
                ApprovalDecision {
                    approval,
                    transaction,
                },
                events,
            ))
        })
    }

    /// Completes an Active transaction. Sender only.
    pub fn complete_transaction(
        &self,
        caller: &WalletAddress,
        transaction_id: TransactionId,
    ) -> Result<CommandOutcome<Transaction>, WorkflowError> {
        self.execute("complete_transaction", caller, |tables| {
            let transaction = tables.require_transaction(transaction_id)?;
            AuthorizationPolicy::authorize(
                &self.actor(tables, caller),
                &Action::CompleteTransaction { transaction },
            )?;
            let old_status = transaction.status;
            let action = TransactionLifecycle::complete(transaction)?;

            let transaction = tables
                .update_transaction(transaction_id, |t| action.apply(t))?
                .clone();
            let event = WorkflowEvent::TransactionStatusUpdated {
                transaction_id,
                old_status,
                new_status: transaction.status,
            };
            Ok((transaction, vec![event]))
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Looks up a user by wallet.
    pub fn get_user(&self, wallet: &WalletAddress) -> Result<User, WorkflowError> {
        self.store.read(|t| t.require_user(wallet).cloned())
    }

    /// Every user, in registration order. Admin only.
    pub fn get_all_users(&self, caller: &WalletAddress) -> Result<Vec<User>, WorkflowError> {
        self.store.read(|t| {
            AuthorizationPolicy::authorize(&self.actor(t, caller), &Action::ListUsers)?;
            Ok(t.users().cloned().collect())
        })
    }

    /// Looks up a transaction by id.
    pub fn get_transaction(&self, id: TransactionId) -> Result<Transaction, WorkflowError> {
        self.store.read(|t| t.require_transaction(id).cloned())
    }

    /// Transactions sent or received by `wallet`, oldest first.
    pub fn get_user_transactions(&self, wallet: &WalletAddress) -> Vec<Transaction> {
        self.store
            .read(|t| t.transactions_for(wallet).into_iter().cloned().collect())
    }

    /// Up to `count` transactions, newest first.
    pub fn get_recent_transactions(&self, count: usize) -> Vec<Transaction> {
        self.store
            .read(|t| t.recent_transactions(count).into_iter().cloned().collect())
    }

    /// Every transaction, oldest first. Admin only.
    pub fn get_all_transactions(
        &self,
        caller: &WalletAddress,
    ) -> Result<Vec<Transaction>, WorkflowError> {
        self.store.read(|t| {
            AuthorizationPolicy::authorize(&self.actor(t, caller), &Action::ListTransactions)?;
            Ok(t.transactions().cloned().collect())
        })
    }

    /// Looks up an approval by id.
    pub fn get_approval(&self, id: ApprovalId) -> Result<Approval, WorkflowError> {
        self.store.read(|t| t.require_approval(id).cloned())
    }

    /// Approvals awaiting a decision, oldest first.
    pub fn get_pending_approvals(&self) -> Vec<Approval> {
        self.store.read(|t| t.pending_approvals().cloned().collect())
    }

    /// Number of registered users.
    pub fn get_user_count(&self) -> u64 {
        self.store.read(Tables::user_count)
    }

    /// Number of transactions.
    pub fn get_transaction_count(&self) -> u64 {
        self.store.read(Tables::transaction_count)
    }

    /// Number of approvals.
    pub fn get_approval_count(&self) -> u64 {
        self.store.read(Tables::approval_count)
    }

    /// All three counts from one consistent view.
    pub fn get_counts(&self) -> Counts {
        self.store.read(|t| Counts {
            user_count: t.user_count(),
            transaction_count: t.transaction_count(),
            approval_count: t.approval_count(),
        })
    }

    /// Dashboard metrics.
    pub fn get_metrics(&self) -> DashboardMetrics {
        self.store.read(compute_metrics)
    }

    // ========================================================================
    // Events and persistence
    // ========================================================================

    /// Subscribes to events committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Retained events with a sequence greater than `sequence`.
    pub fn events_since(&self, sequence: u64) -> Vec<EventEnvelope> {
        self.events.since(sequence)
    }

    /// Retained events after `sequence` plus the newest sequence, read together.
    pub fn replay_events(&self, sequence: u64) -> EventReplay {
        self.events.replay(sequence)
    }

    /// Sequence number of the last published event.
    pub fn last_event_sequence(&self) -> u64 {
        self.events.last_sequence()
    }

    /// A consistent image of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn actor<'a>(&'a self, tables: &'a Tables, address: &'a WalletAddress) -> Actor<'a> {
        Actor::new(address, tables.user_by_address(address), self.owner.as_ref())
    }

    fn new_user(
        &self,
        wallet: &WalletAddress,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<NewUser, WorkflowError> {
        Ok(NewUser {
            wallet_address: wallet.clone(),
            name: self.limits.name(name)?,
            email: self.limits.email(email)?,
            role,
        })
    }

    /// Fails if `target` holds the only admin authority left.
    fn guard_last_admin(&self, tables: &Tables, target: &User) -> Result<(), WorkflowError> {
        if target.role != UserRole::Admin || !target.is_active || self.owner.is_some() {
            return Ok(());
        }
        let other_admin = tables
            .users()
            .any(|u| u.id != target.id && u.is_active && u.role == UserRole::Admin);
        if other_admin {
            Ok(())
        } else {
            Err(WorkflowError::LastAdmin(target.wallet_address.clone()))
        }
    }

    fn execute<T>(
        &self,
        command: &'static str,
        caller: &WalletAddress,
        f: impl FnOnce(&mut Tables) -> CommandResult<T>,
    ) -> Result<CommandOutcome<T>, WorkflowError> {
        self.store.write(|tables| match f(tables) {
            Ok((value, events)) => {
                let events = self.events.publish(events);
                if let Some(last) = events.last() {
                    tables.set_last_event_sequence(last.sequence);
                }
                info!(
                    command,
                    caller = %caller,
                    events = events.len(),
                    "Command committed"
                );
                Ok(CommandOutcome { value, events })
            }
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    debug!(command, caller = %caller, error = %err, "Command rejected");
                } else {
                    warn!(
                        command,
                        caller = %caller,
                        kind = %err.kind(),
                        error = %err,
                        "Command rejected"
                    );
                }
                Err(err)
            }
        })
    }
}
