use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use service::errors::ServiceError;

/// Client-facing errors. Every variant renders as `{"message": ...}` with
/// its status code; the display string is the wire message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not found")]
    UserNotFound,
    #[error("Not Found")]
    RouteNotFound,
    #[error("Too many requests from this IP, please try again after 5 minutes")]
    RateLimited,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UserNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(_) => ApiError::UserNotFound,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({"message": self.to_string()}))).into_response()
    }
}
