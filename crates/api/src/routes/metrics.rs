//! Dashboard metrics route.

use axum::{Json, Router, extract::State, routing::get};
use finplat_core::{DashboardMetrics, workflow::Counts};
use serde::Serialize;

use crate::AppState;

/// Creates the metrics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(get_metrics))
}

/// Metrics response: the three entity counts plus the dashboard figures.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    /// Entity counts.
    #[serde(flatten)]
    pub counts: Counts,
    /// Dashboard figures.
    pub metrics: DashboardMetrics,
}

/// GET `/metrics` - Counts and dashboard metrics.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        counts: state.engine.get_counts(),
        metrics: state.engine.get_metrics(),
    })
}
