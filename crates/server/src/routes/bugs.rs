// crates/server/src/routes/bugs.rs
//! Bug queue endpoints backed by the issue tracker.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tracker::TriagedBug;

/// Default cap for a batch triage run.
const DEFAULT_BATCH_MAX: usize = 10;

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchTriageRequest {
    pub max: Option<usize>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bugs", get(list_bugs))
        .route("/bugs/{id}", get(get_bug))
        .route("/bugs/{id}/assign-copilot", post(assign_copilot))
        .route("/bugs/{id}/retriage", post(retriage))
        .route("/triage/batch", post(batch_triage))
}

/// GET /api/bugs
async fn list_bugs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TriagedBug>>> {
    Ok(Json(state.tracker.triaged_bugs().await?))
}

/// GET /api/bugs/{id}
async fn get_bug(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<TriagedBug>> {
    state
        .tracker
        .bug(id)
        .await?
        .map(Json)
        .ok_or(ApiError::BugNotFound(id))
}

/// POST /api/bugs/{id}/assign-copilot
async fn assign_copilot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<serde_json::Value>> {
    state.tracker.assign_to_copilot(id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Bug {id} assigned to Copilot"),
    })))
}

/// POST /api/bugs/{id}/retriage
async fn retriage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<serde_json::Value>> {
    state.tracker.retriage(id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Triage started for bug {id}"),
        "demo": state.demo,
    })))
}

/// POST /api/triage/batch
///
/// The body is optional; a missing or unparseable body runs with the
/// default cap.
async fn batch_triage(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let request: BatchTriageRequest = serde_json::from_slice(&body).unwrap_or_default();
    let max = request.max.unwrap_or(DEFAULT_BATCH_MAX);
    state.tracker.batch_triage(max).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Batch triage started",
        "demo": state.demo,
    })))
}
