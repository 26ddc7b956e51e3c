//! Approval routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use finplat_core::workflow::{Approval, ApprovalDecision, CommandOutcome};
use finplat_shared::ApprovalId;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiResult, middleware::WalletUser, routes::parse_id};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(pending_approvals))
        .route("/approvals/{id}", get(get_approval))
        .route("/approvals/{id}/process", post(process_approval))
}

/// Request body for deciding an approval.
#[derive(Debug, Deserialize)]
pub struct ProcessApprovalRequest {
    /// True to approve, false to reject.
    pub approved: bool,
    /// Optional note from the approver.
    #[serde(default)]
    pub reason: Option<String>,
}

/// List of approvals.
#[derive(Debug, Serialize)]
pub struct ApprovalList {
    /// Pending approvals, oldest first.
    pub approvals: Vec<Approval>,
}

/// GET `/approvals/pending` - Approvals waiting for a decision.
async fn pending_approvals(State(state): State<AppState>) -> Json<ApprovalList> {
    Json(ApprovalList {
        approvals: state.engine.get_pending_approvals(),
    })
}

/// GET `/approvals/{id}` - Look up an approval.
async fn get_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Approval>> {
    let id: ApprovalId = parse_id("approval_id", &id)?;
    Ok(Json(state.engine.get_approval(id)?))
}

/// POST `/approvals/{id}/process` - Approve or reject (Admin or Manager).
async fn process_approval(
    State(state): State<AppState>,
    WalletUser(caller): WalletUser,
    Path(id): Path<String>,
    Json(body): Json<ProcessApprovalRequest>,
) -> ApiResult<Json<CommandOutcome<ApprovalDecision>>> {
    let id: ApprovalId = parse_id("approval_id", &id)?;
    let outcome =
        state
            .engine
            .process_approval(&caller, id, body.approved, body.reason.as_deref())?;
    Ok(Json(outcome))
}
