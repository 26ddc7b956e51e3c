//! Request middleware and extractors.

pub mod wallet;

pub use wallet::{WALLET_HEADER, WalletUser, wallet_middleware};
