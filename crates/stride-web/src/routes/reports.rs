use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use stride_core::analytics::{ClientReport, Scope, ScopedView, TrainerReport};

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/reports/trainer", get(trainer_report))
        .route("/api/v1/reports/client", get(client_report))
}

/// Report filters. The subject defaults to the current user.
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

async fn trainer_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Json<TrainerReport> {
    let trainer_id = params.user_id.unwrap_or_else(|| state.current_user().id);
    let mut scope = Scope::trainer(trainer_id).between(params.from, params.to);
    scope.course_id = params.course_id;

    let store = state.dispatcher.snapshot();
    let view = ScopedView::new(&store, &scope);
    Json(TrainerReport::build(&view, &state.config.analytics))
}

async fn client_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Json<ClientReport> {
    let client_id = params.user_id.unwrap_or_else(|| state.current_user().id);
    let mut scope = Scope::client(client_id).between(params.from, params.to);
    scope.course_id = params.course_id;

    let store = state.dispatcher.snapshot();
    let view = ScopedView::new(&store, &scope);
    let today = Utc::now().date_naive();
    Json(ClientReport::build(&view, today, &state.config.analytics))
}
