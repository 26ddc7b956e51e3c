//! User management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use finplat_core::workflow::{CommandOutcome, User, UserRole};
use finplat_shared::{PageRequest, PageResponse};
use serde::Deserialize;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::WalletUser,
    routes::{parse_wallet, transactions::TransactionList},
};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user).get(list_users))
        .route("/users/self", post(self_register))
        .route("/users/{wallet}", get(get_user))
        .route("/users/{wallet}/role", patch(update_role))
        .route("/users/{wallet}/status", patch(update_status))
        .route("/users/{wallet}/transactions", get(user_transactions))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for registering another wallet.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Wallet to register.
    pub wallet_address: String,
    /// Display name.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Role name (`regular`, `manager`, `admin`) or index (`0`..`2`).
    pub role: String,
}

/// Request body for self-registration.
#[derive(Debug, Deserialize)]
pub struct SelfRegisterRequest {
    /// Display name.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
}

/// Request body for a role change.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    /// New role name or index.
    pub role: String,
}

/// Request body for enabling or disabling a user.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New active flag.
    pub is_active: bool,
}

fn parse_role(raw: &str) -> ApiResult<UserRole> {
    UserRole::parse(raw).ok_or_else(|| {
        ApiError::invalid_input(
            "role",
            format!("unknown role {raw:?}, expected regular, manager or admin"),
        )
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/users` - Register a wallet with an explicit role (Admin only).
async fn register_user(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Json(body): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<CommandOutcome<User>>)> {
    let wallet = parse_wallet(&body.wallet_address)?;
    let role = parse_role(&body.role)?;
    let outcome = state.engine.register_user(
        &caller,
        &wallet,
        &body.name,
        &body.email,
        role,
    )?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST `/users/self` - Register the calling wallet as a Regular user.
async fn self_register(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Json(body): Json<SelfRegisterRequest>,
) -> ApiResult<(StatusCode, Json<CommandOutcome<User>>)> {
    let outcome = state
        .engine
        .self_register(&caller, &body.name, &body.email)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET `/users` - List all users, paginated (Admin only).
async fn list_users(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<User>>> {
    let users = state.engine.get_all_users(&caller)?;
    Ok(Json(PageResponse::from_items(users, &page)))
}

/// GET `/users/{wallet}` - Look up a user.
async fn get_user(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Json<User>> {
    let wallet = parse_wallet(&wallet)?;
    Ok(Json(state.engine.get_user(&wallet)?))
}

/// PATCH `/users/{wallet}/role` - Change a user's role (Admin only).
async fn update_role(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Path(wallet): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<Json<CommandOutcome<User>>> {
    let wallet = parse_wallet(&wallet)?;
    let role = parse_role(&body.role)?;
    Ok(Json(state.engine.update_user_role(&caller, &wallet, role)?))
}

/// PATCH `/users/{wallet}/status` - Disable or re-enable a user (Admin only).
async fn update_status(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Path(wallet): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> ApiResult<Json<CommandOutcome<User>>> {
    let wallet = parse_wallet(&wallet)?;
    Ok(Json(
        state
            .engine
            .set_user_active(&caller, &wallet, body.is_active)?,
    ))
}

/// GET `/users/{wallet}/transactions` - Transactions sent or received by a wallet, oldest first.
async fn user_transactions(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Json<TransactionList>> {
    let wallet = parse_wallet(&wallet)?;
    Ok(Json(TransactionList {
        transactions: state.engine.get_user_transactions(&wallet),
    }))
}
