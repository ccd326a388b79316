use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::reconciler::ReconciliationReport;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/reconcile", post(reconcile))
}

#[derive(Deserialize)]
pub struct ReconcileParams {
    #[serde(default)]
    pub dry_run: bool,
}

async fn reconcile(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReconcileParams>,
) -> Json<ReconciliationReport> {
    let report = state.reconciler.sweep(params.dry_run);
    state
        .metrics
        .workload_drift_couriers
        .set((report.mismatches.len() - report.fixed) as i64);

    Json(report)
}
