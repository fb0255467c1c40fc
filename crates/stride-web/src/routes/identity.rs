//! Current-user toggles. No credential is checked anywhere.

use std::sync::{Arc, PoisonError};

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use stride_core::model::{Role, User};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/me", get(me).post(set_current))
        .route("/api/v1/me/role", post(switch_role))
        .route("/api/v1/users", get(users))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SwitchRoleResponse {
    pub switched: bool,
    pub user: User,
}

async fn me(State(state): State<Arc<AppState>>) -> Json<User> {
    Json(state.current_user())
}

async fn users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    let identity = state.identity.read().unwrap_or_else(PoisonError::into_inner);
    Json(identity.users().to_vec())
}

async fn set_current(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SetCurrentRequest>,
) -> Result<Json<User>, ApiError> {
    let mut identity = state.identity.write().unwrap_or_else(PoisonError::into_inner);
    let user = identity.set_current(&input.user_id)?.clone();
    Ok(Json(user))
}

/// Switching to a role nobody has leaves the current user in place.
async fn switch_role(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SwitchRoleRequest>,
) -> Result<Json<SwitchRoleResponse>, ApiError> {
    let role: Role = input.role.parse().map_err(ApiError::bad_request)?;
    let mut identity = state.identity.write().unwrap_or_else(PoisonError::into_inner);
    let switched = identity.switch_role(role);
    Ok(Json(SwitchRoleResponse {
        switched,
        user: identity.current().clone(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_me_defaults_to_first_user() {
        let resp = test_router().oneshot(get("/api/v1/me")).await.unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["name"], "Sarah Johnson");
        assert_eq!(json["role"], "client");
    }

    #[tokio::test]
    async fn test_switch_role() {
        let state = test_app_state();
        let app = crate::routes::router().with_state(state.clone());

        let resp = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/v1/me/role",
                serde_json::json!({ "role": "trainer" }),
            ))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["switched"], true);
        assert_eq!(json["user"]["name"], "Mike Chen");
        assert_eq!(state.current_user().id, "2");

        let resp = app
            .oneshot(send_json(
                "POST",
                "/api/v1/me/role",
                serde_json::json!({ "role": "coach" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_set_current() {
        let app = test_router();
        let resp = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/v1/me",
                serde_json::json!({ "userId": "4" }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp.into_body()).await["role"], "admin");

        let resp = app
            .oneshot(send_json(
                "POST",
                "/api/v1/me",
                serde_json::json!({ "userId": "99" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_users() {
        let resp = test_router().oneshot(get("/api/v1/users")).await.unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 4);
    }
}
