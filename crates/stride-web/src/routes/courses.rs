use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use stride_core::catalog::{CourseQuery, CourseSort};
use stride_core::model::*;
use stride_core::store::{Command, Outcome};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/courses", get(list_courses).post(create_course))
        .route(
            "/api/v1/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/api/v1/courses/{id}/enroll", post(enroll))
}

// -- Request/Response types --

#[derive(Debug, Deserialize)]
pub struct CourseListParams {
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub trainer_id: Option<String>,
    pub sort: Option<String>,
}

impl CourseListParams {
    fn into_query(self) -> Result<CourseQuery, ApiError> {
        let difficulty = self
            .difficulty
            .filter(|d| !d.is_empty() && d != "all")
            .map(|d| d.parse::<Difficulty>())
            .transpose()
            .map_err(ApiError::bad_request)?;
        let sort = self
            .sort
            .map(|s| s.parse::<CourseSort>())
            .transpose()
            .map_err(ApiError::bad_request)?
            .unwrap_or_default();
        Ok(CourseQuery {
            search: self.search,
            difficulty,
            trainer_id: self.trainer_id,
            sort,
        })
    }
}

/// A course plus the capacity flags the course cards show.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub spots_left: u32,
    pub is_full: bool,
    pub is_almost_full: bool,
}

impl From<&Course> for CourseView {
    fn from(course: &Course) -> Self {
        Self {
            spots_left: course.spots_left(),
            is_full: course.is_full(),
            is_almost_full: course.is_almost_full(),
            course: course.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseView,
    pub sessions: Vec<Session>,
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    pub difficulty: String,
    pub max_capacity: u32,
    #[serde(default)]
    pub schedule: String,
    /// Comma-separated, as typed into the course form.
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// The enrollment form. Only the course and the current user end up in the
/// store; the rest is checked and dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub emergency_contact: String,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub fitness_goals: Option<String>,
    #[serde(default)]
    pub agree_to_terms: bool,
}

impl EnrollRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required("name", &self.name)?;
        validate_email(&self.email)?;
        validate_required("phone", &self.phone)?;
        validate_required("emergencyContact", &self.emergency_contact)?;
        if !self.agree_to_terms {
            return Err(ApiError::bad_request(
                "you must agree to the terms and conditions",
            ));
        }
        Ok(())
    }
}

// -- Handlers --

async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CourseListParams>,
) -> Result<Json<Vec<CourseView>>, ApiError> {
    let query = params.into_query()?;
    let store = state.dispatcher.snapshot();
    let courses = query
        .run(store.courses())
        .into_iter()
        .map(CourseView::from)
        .collect();
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, ApiError> {
    let store = state.dispatcher.snapshot();
    let course = store
        .course(&id)
        .ok_or_else(|| ApiError::not_found(format!("course {id} not found")))?;

    let mut sessions: Vec<Session> = store.sessions_for_course(&id).cloned().collect();
    sessions.sort_by_key(|s| (s.date, s.time));

    Ok(Json(CourseDetail {
        course: CourseView::from(course),
        sessions,
        enrollments: store.enrollments_for_course(&id).cloned().collect(),
    }))
}

/// New courses belong to the current user.
async fn create_course(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseView>), ApiError> {
    let difficulty: Difficulty = input.difficulty.parse().map_err(ApiError::bad_request)?;
    let trainer = state.current_user();

    let mut course = Course::new(new_id(), input.title.trim(), trainer.id, difficulty, input.max_capacity)
        .with_description(input.description)
        .with_duration(input.duration)
        .with_schedule(input.schedule)
        .with_objectives(parse_objectives(&input.objectives));
    if let Some(image) = input.image {
        course = course.with_image(image);
    }
    validate_course(&course)?;

    super::run(&state, Command::AddCourse(course.clone())).await?;
    tracing::info!(course_id = %course.id, "course created");

    let store = state.dispatcher.snapshot();
    let stored = store.course(&course.id).unwrap_or(&course);
    Ok((StatusCode::CREATED, Json(CourseView::from(stored))))
}

async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut course): Json<Course>,
) -> Result<Json<serde_json::Value>, ApiError> {
    course.id = id;
    validate_course(&course)?;
    let outcome: Outcome = super::run(&state, Command::UpdateCourse(course)).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    super::run(&state, Command::DeleteCourse(id.clone())).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// Enroll the current user in a course.
async fn enroll(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<Enrollment>), ApiError> {
    input.validate()?;
    let client = state.current_user();
    let enrollment = Enrollment::new(
        new_id(),
        client.id,
        id,
        state.config.store.default_total_sessions,
    );

    super::run(&state, Command::AddEnrollment(enrollment.clone())).await?;
    tracing::info!(enrollment_id = %enrollment.id, course_id = %enrollment.course_id, "enrolled");
    Ok((StatusCode::CREATED, Json(enrollment)))
}
