//! Common types used across the application.

pub mod address;
pub mod amount;
pub mod id;
pub mod pagination;

pub use address::{AddressError, WalletAddress};
pub use id::*;
pub use pagination::{PageMeta, PageRequest, PageResponse};

/// Amount in the smallest currency unit.
pub type Amount = u128;
