//! Raw command endpoint plus dispatcher status, undo and history.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use stride_core::dispatch::DispatchStatus;
use stride_core::history::CommandEvent;
use stride_core::store::{Command, Outcome};

use crate::error::ApiError;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/commands", post(submit_command))
        .route("/api/v1/status", get(status))
        .route("/api/v1/undo", post(undo))
        .route("/api/v1/history", get(history))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: DispatchStatus,
    pub can_undo: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub entity_id: Option<String>,
}

/// Accepts `{"type": "...", "payload": ...}`. Anything that isn't a known
/// command is a 400, never a silent no-op.
async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command: Command = serde_json::from_value(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid command: {e}")))?;
    command.validate()?;
    let outcome = super::run(&state, command).await?;
    Ok(Json(CommandResponse { outcome }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.dispatcher.status(),
        can_undo: state.dispatcher.can_undo(),
    })
}

async fn undo(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = state.current_user().id;
    state.dispatcher.undo(&actor).await?;
    Ok(Json(serde_json::json!({ "undone": true })))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<CommandEvent>> {
    let log = state.dispatcher.history();
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let events = match params.entity_id {
        Some(id) => log.history_for(&id).into_iter().take(limit).collect(),
        None => log.recent(limit),
    };
    Json(events)
}
