// crates/server/src/routes/mod.rs
//! API route handlers.

pub mod agent;
pub mod bugs;
pub mod config;
pub mod health;
pub mod sessions;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router, nested under `/api`.
///
/// Routes:
/// - GET  /api/health                      - Health check
/// - GET  /api/sessions                    - List session summaries
/// - GET  /api/sessions/active             - Liveness heuristic
/// - GET  /api/sessions/{id}               - Full transcript read
/// - GET  /api/sessions/{id}/stream        - SSE live tail
/// - GET  /api/bugs                        - Bug review queue
/// - GET  /api/bugs/{id}                   - Single bug
/// - POST /api/bugs/{id}/assign-copilot    - Hand a bug to Copilot
/// - POST /api/bugs/{id}/retriage          - Re-run triage for one bug
/// - POST /api/triage/batch                - Batch triage run
/// - GET  /api/config, POST /api/config    - Settings view / persist
/// - GET  /api/me                          - Signed-in identity
/// - GET  /api/claude/status               - Agent CLI probe
/// - POST /api/claude/launch-auth          - Launch agent CLI for auth
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", sessions::router())
        .nest("/api", bugs::router())
        .nest("/api", config::router())
        .nest("/api", agent::router())
        .with_state(state)
}
