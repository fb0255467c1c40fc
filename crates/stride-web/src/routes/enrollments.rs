use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;
use stride_core::model::{validate_enrollment, Enrollment};
use stride_core::store::Command;

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/enrollments", get(list_enrollments))
        .route(
            "/api/v1/enrollments/{id}",
            put(update_enrollment).delete(delete_enrollment),
        )
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentParams {
    pub client_id: Option<String>,
    pub course_id: Option<String>,
}

async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EnrollmentParams>,
) -> Json<Vec<Enrollment>> {
    let store = state.dispatcher.snapshot();
    let enrollments = store
        .enrollments()
        .iter()
        .filter(|e| params.client_id.as_deref().map_or(true, |c| e.client_id == c))
        .filter(|e| params.course_id.as_deref().map_or(true, |c| e.course_id == c))
        .cloned()
        .collect();
    Json(enrollments)
}

async fn update_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut enrollment): Json<Enrollment>,
) -> Result<Json<serde_json::Value>, ApiError> {
    enrollment.id = id;
    validate_enrollment(&enrollment)?;
    let outcome = super::run(&state, Command::UpdateEnrollment(enrollment)).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

async fn delete_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    super::run(&state, Command::DeleteEnrollment(id.clone())).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_filters_by_client() {
        let resp = test_router()
            .oneshot(get("/api/v1/enrollments?client_id=3"))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_progress() {
        let app = test_router();
        let resp = app
            .clone()
            .oneshot(get("/api/v1/enrollments?client_id=1&course_id=1"))
            .await
            .unwrap();
        let mut enrollment = body_json(resp.into_body()).await[0].clone();
        enrollment["progress"] = 80.into();

        let resp = app
            .clone()
            .oneshot(send_json("PUT", "/api/v1/enrollments/1", enrollment))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(get("/api/v1/enrollments?client_id=1&course_id=1"))
            .await
            .unwrap();
        assert_eq!(body_json(resp.into_body()).await[0]["progress"], 80);
    }

    #[tokio::test]
    async fn test_update_rejects_progress_over_100() {
        let body = serde_json::json!({
            "id": "1", "clientId": "1", "courseId": "1",
            "enrolledAt": "2025-12-15T09:00:00Z",
            "progress": 140, "sessionsAttended": 2, "totalSessions": 24
        });
        let resp = test_router()
            .oneshot(send_json("PUT", "/api/v1/enrollments/1", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_enrollment_frees_a_spot() {
        let app = test_router();
        let resp = app.clone().oneshot(delete("/api/v1/enrollments/3")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.oneshot(get("/api/v1/courses/1")).await.unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["currentEnrollment"], 1);
    }
}
