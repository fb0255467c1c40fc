use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use stride_core::model::{new_id, validate_progress_record, ProgressRecord, MAX_PERCENT};
use stride_core::store::Command;

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/progress", get(list_progress).post(add_progress))
}

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    pub client_id: Option<String>,
    pub course_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProgressRequest {
    pub client_id: String,
    pub session_id: String,
    pub performance: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Newest first.
async fn list_progress(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProgressParams>,
) -> Json<Vec<ProgressRecord>> {
    let store = state.dispatcher.snapshot();
    let mut records: Vec<ProgressRecord> = store
        .progress_records()
        .iter()
        .filter(|r| params.client_id.as_deref().map_or(true, |c| r.client_id == c))
        .filter(|r| params.course_id.as_deref().map_or(true, |c| r.course_id == c))
        .cloned()
        .collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));
    Json(records)
}

/// Course and date come from the session being scored.
async fn add_progress(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AddProgressRequest>,
) -> Result<(StatusCode, Json<ProgressRecord>), ApiError> {
    if input.performance > MAX_PERCENT {
        return Err(ApiError::bad_request(format!(
            "performance must be between 0 and {MAX_PERCENT}"
        )));
    }
    let store = state.dispatcher.snapshot();
    let session = store
        .session(&input.session_id)
        .ok_or_else(|| ApiError::not_found(format!("session {} not found", input.session_id)))?;

    let mut record = ProgressRecord::new(
        new_id(),
        input.client_id,
        session.id.clone(),
        session.course_id.clone(),
        session.date,
        input.performance,
    );
    if let Some(notes) = input.notes.filter(|n| !n.trim().is_empty()) {
        record = record.with_notes(notes);
    }
    validate_progress_record(&record)?;

    super::run(&state, Command::AddProgressRecord(record.clone())).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
