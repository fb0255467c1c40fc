pub mod commands;
pub mod courses;
pub mod enrollments;
pub mod identity;
pub mod progress;
pub mod reports;
pub mod sessions;

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use stride_core::store::{Command, Outcome};

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(commands::routes())
        .merge(courses::routes())
        .merge(enrollments::routes())
        .merge(sessions::routes())
        .merge(progress::routes())
        .merge(identity::routes())
        .merge(reports::routes())
        .fallback(not_found)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store = state.dispatcher.snapshot();
    let status = state.dispatcher.status();
    Json(serde_json::json!({
        "status": "ok",
        "loading": status.loading,
        "courses": store.courses().len(),
        "enrollments": store.enrollments().len(),
        "sessions": store.sessions().len(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("no such endpoint")
}

/// Dispatch on behalf of the current user.
pub(crate) async fn run(state: &AppState, command: Command) -> Result<Outcome, ApiError> {
    let actor = state.current_user().id;
    Ok(state.dispatcher.dispatch_as(command, &actor).await?)
}
