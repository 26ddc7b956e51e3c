//! API route definitions.

use std::str::FromStr;

use axum::{Router, middleware};
use finplat_shared::WalletAddress;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::wallet_middleware,
};

pub mod approvals;
pub mod events;
pub mod health;
pub mod metrics;
pub mod transactions;
pub mod users;


/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(transactions::routes())
        .merge(approvals::routes())
        .merge(metrics::routes())
        .merge(events::routes())
        .layer(middleware::from_fn(wallet_middleware))
}

/// Parses a wallet address path segment or body field.
pub(crate) fn parse_wallet(raw: &str) -> ApiResult<WalletAddress> {
    WalletAddress::parse(raw).map_err(|e| ApiError::invalid_input("wallet", e.to_string()))
}

/// Parses a numeric id path segment. Ids start at 1.
pub(crate) fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> ApiResult<T> {
    raw.parse()
        .map_err(|_| ApiError::invalid_input(field, format!("not a valid id: {raw:?}")))
}
