use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;

/// An error response: `{ "ok": false, "error": ..., "context": ... }`.
#[derive(Debug)]
pub struct ApiErrorType {
    status: StatusCode,
    error: String,
    context: Option<String>,
}

impl From<ServiceError> for ApiErrorType {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation { .. } | ServiceError::Calendar { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if err.is_client_error() {
            Self {
                status,
                error: err.to_string(),
                context: None,
            }
        } else {
            error!("Request failed: {}", err);
            Self {
                status,
                error: "Failed to query the database".to_string(),
                context: Some(err.to_string()),
            }
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "ok": false,
                "error": self.error,
                "context": self.context,
            })),
        )
            .into_response()
    }
}
