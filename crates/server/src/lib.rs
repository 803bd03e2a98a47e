// crates/server/src/lib.rs
//! Triage-console server library.
//!
//! Axum HTTP service pairing an issue-tracker bug queue with live agent
//! transcript streaming. Route handlers stay thin: the transcript engine
//! lives in `triage-console-core` and the tracker behind the [`tracker::Tracker`]
//! trait.

pub mod error;
pub mod routes;
pub mod settings;
pub mod state;
pub mod tracker;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::api_routes;
pub use settings::DashboardSettings;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and middleware.
///
/// Sets up the API routes, permissive CORS for local development, request
/// tracing, and (when a frontend build is present) static file serving
/// with an SPA fallback.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if let Some(dist) = static_dir() {
        let index = ServeFile::new(dist.join("index.html"));
        app = app.fallback_service(ServeDir::new(&dist).fallback(index));
    }

    app
}

/// Frontend build directory: `STATIC_DIR` override, else `./dist` when it
/// exists, else API-only mode.
fn static_dir() -> Option<PathBuf> {
    std::env::var("STATIC_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            let dist = PathBuf::from("dist");
            dist.is_dir().then_some(dist)
        })
}

// ============================================================================
// Integration Tests
// ============================================================================
