//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes over the workflow engine
//! - Wallet identification middleware
//! - Error responses carrying structured error kinds
//! - A server-sent event stream of workflow events

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use finplat_core::WorkflowEngine;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The workflow engine.
    pub engine: Arc<WorkflowEngine>,
}

impl AppState {
    /// Wraps an engine for sharing across handlers.
    #[must_use]
    pub fn new(engine: WorkflowEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
