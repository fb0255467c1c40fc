use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use stride_core::StrideError;

/// JSON API error: `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<StrideError> for ApiError {
    fn from(err: StrideError) -> Self {
        match &err {
            StrideError::NotFound(_) => Self::not_found(err.to_string()),
            StrideError::InvalidInput(_) => Self::bad_request(err.to_string()),
            e if e.is_conflict() => Self::conflict(err.to_string()),
            _ => {
                tracing::error!("api error: {}", err);
                Self::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StrideError::NotFound("course c9".into()), StatusCode::NOT_FOUND),
            (StrideError::InvalidInput("title is required".into()), StatusCode::BAD_REQUEST),
            (StrideError::DuplicateId("course 1".into()), StatusCode::CONFLICT),
            (StrideError::CapacityExceeded("course 1".into()), StatusCode::CONFLICT),
            (StrideError::Busy, StatusCode::CONFLICT),
            (StrideError::Config("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_message_kept() {
        let err = ApiError::from(StrideError::NotFound("session 7".into()));
        assert_eq!(err.message, "Not found: session 7");
    }
}
