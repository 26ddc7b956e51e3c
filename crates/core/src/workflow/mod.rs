//! Transaction and approval workflow.
//!
//! This module implements the two linked lifecycles, the role-based
//! authorization policy, and the facade that composes them over a single
//! entity store.
//!
//! # Modules
//!
//! - `types` - Users, transactions, approvals and their status enums
//! - `error` - Structured workflow errors
//! - `validation` - Field limits applied before any mutation
//! - `policy` - Who may perform which action
//! - `store` - Entity tables behind one lock, plus snapshots
//! - `transaction` - Transaction state transitions
//! - `approval` - Approval state transitions and their effect on transactions
//! - `events` - Event types and the publish/subscribe bus
//! - `engine` - The command/query facade

pub mod approval;
pub mod engine;
pub mod error;
pub mod events;
pub mod policy;
pub mod store;
pub mod transaction;
pub mod types;
pub mod validation;

#[cfg(test)]
mod approval_props;
#[cfg(test)]
mod policy_props;
#[cfg(test)]
mod transaction_props;

pub use approval::{ApprovalAction, ApprovalLifecycle};
pub use engine::{ApprovalDecision, CommandOutcome, Counts, WorkflowEngine};
pub use error::{EntityKind, ErrorKind, WorkflowError};
pub use events::{EventBus, EventEnvelope, EventReplay, WorkflowEvent};
pub use policy::{Action, Actor, AuthorizationPolicy, Decision};
pub use store::{EntityStore, StoreSnapshot, Tables};
pub use transaction::{TransactionAction, TransactionLifecycle};
pub use types::{
    Approval, ApprovalStatus, ApprovalType, Transaction, TransactionStatus, User, UserRole,
};
pub use validation::InputLimits;
