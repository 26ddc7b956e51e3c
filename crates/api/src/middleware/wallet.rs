//! Wallet identification for requests.
//!
//! The caller names its wallet in the `X-Wallet-Address` header. Signature
//! checks happen in the wallet layer in front of this service; here the
//! header is only parsed and normalized.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use finplat_shared::WalletAddress;

use crate::error::ApiError;

/// Header carrying the caller's wallet address.
pub const WALLET_HEADER: &str = "x-wallet-address";

/// Parses the wallet header and stores the address in request extensions.
///
/// Requests without the header pass through untouched; a header that is not a
/// valid address is rejected with 401.
pub async fn wallet_middleware(mut request: Request, next: Next) -> Response {
    let Some(raw) = request.headers().get(WALLET_HEADER) else {
        return next.run(request).await;
    };

    let parsed = raw
        .to_str()
        .map_err(|_| "header is not valid ASCII".to_string())
        .and_then(|value| WalletAddress::parse(value).map_err(|e| e.to_string()));

    match parsed {
        Ok(address) => {
            request.extensions_mut().insert(address);
            next.run(request).await
        }
        Err(reason) => ApiError::unauthenticated(
            "INVALID_WALLET_ADDRESS",
            format!("Invalid X-Wallet-Address header: {reason}"),
        )
        .into_response(),
    }
}

/// Extractor for the identified caller.
///
/// ```ignore
/// async fn handler(WalletUser(caller): WalletUser) -> impl IntoResponse {
///     // caller: WalletAddress
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WalletUser(pub WalletAddress);

impl WalletUser {
    /// Returns the caller's address.
    #[must_use]
    pub fn address(&self) -> &WalletAddress {
        &self.0
    }
}

impl<S> FromRequestParts<S> for WalletUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<WalletAddress>()
            .cloned()
            .map(WalletUser)
            .ok_or_else(|| {
                ApiError::unauthenticated(
                    "MISSING_WALLET_ADDRESS",
                    "X-Wallet-Address header is required",
                )
            })
    }
}
