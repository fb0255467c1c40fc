use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use stride_core::model::{new_id, validate_session, Session};
use stride_core::store::{AttendanceMark, Command};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/v1/sessions/{id}",
            put(update_session).delete(delete_session),
        )
        .route("/api/v1/sessions/{id}/attendance", post(record_attendance))
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub course_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub course_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub client_id: String,
    #[serde(default = "default_present")]
    pub present: bool,
}

fn default_present() -> bool {
    true
}

/// Sessions in schedule order.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Json<Vec<Session>> {
    let store = state.dispatcher.snapshot();
    let mut sessions: Vec<Session> = store
        .sessions()
        .iter()
        .filter(|s| params.course_id.as_deref().map_or(true, |c| s.course_id == c))
        .cloned()
        .collect();
    sessions.sort_by_key(|s| (s.date, s.time));
    Json(sessions)
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let mut session = Session::new(new_id(), input.course_id, input.date, input.time)
        .with_exercises(
            input
                .exercises
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        );
    if let Some(notes) = input.notes.filter(|n| !n.trim().is_empty()) {
        session = session.with_notes(notes);
    }
    validate_session(&session)?;

    super::run(&state, Command::AddSession(session.clone())).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut session): Json<Session>,
) -> Result<Json<serde_json::Value>, ApiError> {
    session.id = id;
    validate_session(&session)?;
    let outcome = super::run(&state, Command::UpdateSession(session)).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    super::run(&state, Command::DeleteSession(id.clone())).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn record_attendance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<AttendanceRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mark = AttendanceMark {
        session_id: id,
        client_id: input.client_id,
        present: input.present,
    };
    let outcome = super::run(&state, Command::RecordAttendance(mark)).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}
