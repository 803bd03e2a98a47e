// crates/server/src/routes/sessions.rs
//! Session endpoints: catalog listing, liveness, full reads, and the SSE
//! live tail.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use triage_console_core::{SessionMessage, SessionSummary};

use crate::error::ApiResult;
use crate::state::AppState;

/// Default catalog page size.
const DEFAULT_MAX: usize = 20;

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionsQuery {
    pub max: Option<usize>,
    pub triage_only: Option<bool>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/active", get(active_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/stream", get(stream_session))
}

/// GET /api/sessions?max=20&triageOnly=false
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionsQuery>,
) -> Json<Vec<SessionSummary>> {
    let max = query.max.unwrap_or(DEFAULT_MAX);
    let triage_only = query.triage_only.unwrap_or(false);
    Json(state.store.list_sessions(max, triage_only).await)
}

/// GET /api/sessions/active
async fn active_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.active_session_id().await {
        Some(id) => Json(serde_json::json!({ "active": true, "id": id })),
        None => Json(serde_json::json!({ "active": false })),
    }
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SessionMessage>>> {
    Ok(Json(state.store.read_session(&id).await?))
}

/// GET /api/sessions/{id}/stream
///
/// Tails the transcript as Server-Sent Events, one `data:` frame per
/// message. The tail is cancelled when the client disconnects (the SSE
/// body is dropped, which drops the guard).
async fn stream_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let cancel = CancellationToken::new();
    let messages = state.store.stream_session(&id, cancel.clone());

    let stream = async_stream::stream! {
        let _guard = cancel.drop_guard();
        tokio::pin!(messages);
        while let Some(msg) = messages.next().await {
            yield Ok(Event::default().data(serde_json::to_string(&msg).unwrap_or_default()));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
