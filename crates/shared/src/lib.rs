//! Shared types, errors, and configuration for Finplat.
//!
//! This crate provides common types used across all other crates:
//! - Typed sequential IDs for type-safe entity references
//! - Wallet addresses with case-insensitive identity
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, PersistenceConfig, ServerConfig, WorkflowConfig};
pub use error::{AppError, AppResult};
pub use types::{Amount, ApprovalId, PageRequest, PageResponse, TransactionId, UserId, WalletAddress};
