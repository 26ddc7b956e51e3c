//! Dashboard metrics.
//!
//! This module provides the figures shown on the dashboard cards:
//! - Entity counts
//! - Pending approvals
//! - Transactions per status and settled volume

pub mod metrics;
pub mod types;

pub use metrics::compute_metrics;
pub use types::*;
