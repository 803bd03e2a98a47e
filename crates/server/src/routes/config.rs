// crates/server/src/routes/config.rs
//! Settings view/persistence and the current-user identity endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::process::Command;

use crate::error::{ApiError, ApiResult};
use crate::settings::DashboardSettings;
use crate::state::AppState;

/// Settings as exposed to the frontend, plus derived flags.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub ado_org: String,
    pub ado_project: String,
    pub area_path: String,
    pub iteration_path: String,
    pub copilot_user_id: String,
    pub repo_project_guid: String,
    pub repo_guid: String,
    pub branch_ref: String,
    pub triage_pipeline_name: String,
    pub max_bugs_default: usize,
    pub is_configured: bool,
    pub demo: bool,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config", get(get_config).post(save_config))
        .route("/me", get(me))
}

/// GET /api/config
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let s = &state.settings;
    Json(ConfigResponse {
        ado_org: s.ado_org.clone(),
        ado_project: s.ado_project.clone(),
        area_path: s.area_path.clone(),
        iteration_path: s.iteration_path.clone().unwrap_or_default(),
        copilot_user_id: s.copilot_user_id.clone(),
        repo_project_guid: s.repo_project_guid.clone(),
        repo_guid: s.repo_guid.clone(),
        branch_ref: s.branch_ref.clone(),
        triage_pipeline_name: s.triage_pipeline_name.clone(),
        max_bugs_default: s.max_bugs_default,
        is_configured: s.is_configured(),
        demo: state.demo,
    })
}

/// POST /api/config
///
/// Persists the submitted settings document; missing fields take their
/// defaults. Applied on the next start.
async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(new_settings): Json<DashboardSettings>,
) -> ApiResult<Json<Value>> {
    new_settings
        .save(&state.settings_path)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(path = %state.settings_path.display(), "settings saved");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Settings saved. Restart the app to apply changes.",
    })))
}

/// GET /api/me
async fn me(State(state): State<Arc<AppState>>) -> Json<Value> {
    if state.demo {
        return Json(serde_json::json!({ "displayName": "Demo User" }));
    }
    let name = current_account_name().await.unwrap_or_default();
    Json(serde_json::json!({ "displayName": name }))
}

/// Display name of the `az` CLI's signed-in account, when available.
async fn current_account_name() -> Option<String> {
    let output = Command::new("az")
        .args(["account", "show", "--output", "json"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let doc: Value = serde_json::from_slice(&output.stdout).ok()?;
    doc.get("user")?.get("name")?.as_str().map(String::from)
}
