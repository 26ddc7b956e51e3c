//! Core business logic for Finplat.
//!
//! This crate contains the workflow engine with ZERO web dependencies.
//! All domain types, authorization rules, and state transitions live here.
//!
//! # Modules
//!
//! - `workflow` - Users, transactions, approvals and the engine facade
//! - `dashboard` - Aggregated metrics over the entity tables

pub mod dashboard;
pub mod workflow;

pub use dashboard::DashboardMetrics;
pub use workflow::{
    CommandOutcome, ErrorKind, EventEnvelope, StoreSnapshot, WorkflowEngine, WorkflowError,
    WorkflowEvent,
};
