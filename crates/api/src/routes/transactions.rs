//! Transaction routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use finplat_core::workflow::{Approval, CommandOutcome, Transaction};
use finplat_shared::{Amount, PageRequest, PageResponse, TransactionId};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ApiResult,
    middleware::WalletUser,
    routes::{parse_id, parse_wallet},
};

/// Default number of transactions returned by `/transactions/recent`.
const DEFAULT_RECENT_COUNT: usize = 10;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction).get(list_transactions))
        .route("/transactions/recent", get(recent_transactions))
        .route("/transactions/{id}", get(get_transaction))
        .route("/transactions/{id}/approvals", post(request_approval))
        .route("/transactions/{id}/complete", post(complete_transaction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a transaction. The caller is the sender.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Receiver wallet.
    pub to: String,
    /// Amount in the smallest unit, as a decimal string or integer.
    #[serde(with = "finplat_shared::types::amount")]
    pub amount: Amount,
    /// Description.
    pub description: String,
}

/// Request body for requesting approval.
#[derive(Debug, Deserialize)]
pub struct RequestApprovalRequest {
    /// Why the transaction should be approved.
    pub reason: String,
}

/// Query parameters for recent transactions.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Maximum number of transactions; clamped to the total.
    pub count: Option<usize>,
}

/// List of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionList {
    /// Transactions in the order documented by the route.
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/transactions` - Create a Pending transaction from the caller.
async fn create_transaction(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Json(body): Json<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<CommandOutcome<Transaction>>)> {
    let to = parse_wallet(&body.to)?;
    let outcome = state
        .engine
        .create_transaction(&caller, &to, body.amount, &body.description)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET `/transactions` - All transactions, oldest first, paginated (Admin only).
async fn list_transactions(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<Transaction>>> {
    let transactions = state.engine.get_all_transactions(&caller)?;
    Ok(Json(PageResponse::from_items(transactions, &page)))
}

/// GET `/transactions/recent?count=n` - Newest transactions first.
async fn recent_transactions(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<TransactionList> {
    let count = query.count.unwrap_or(DEFAULT_RECENT_COUNT);
    Json(TransactionList {
        transactions: state.engine.get_recent_transactions(count),
    })
}

/// GET `/transactions/{id}` - Look up a transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Transaction>> {
    let id: TransactionId = parse_id("transaction_id", &id)?;
    Ok(Json(state.engine.get_transaction(id)?))
}

/// POST `/transactions/{id}/approvals` - Request approval and link it.
async fn request_approval(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Path(id): Path<String>,
    Json(body): Json<RequestApprovalRequest>,
) -> ApiResult<(StatusCode, Json<CommandOutcome<Approval>>)> {
    let id: TransactionId = parse_id("transaction_id", &id)?;
    let outcome = state.engine.request_approval(&caller, id, &body.reason)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST `/transactions/{id}/complete` - Complete an Active transaction (sender only).
async fn complete_transaction(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CommandOutcome<Transaction>>> {
    let id: TransactionId = parse_id("transaction_id", &id)?;
    Ok(Json(state.engine.complete_transaction(&caller, id)?))
}
