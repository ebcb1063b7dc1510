use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceError;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct StudentsQueryParams {
    /// Case-insensitive substring of the name or email
    pub q: Option<String>,
}

/// GET /students
pub async fn get_students(
    State(s): State<Arc<AppState>>,
    Query(params): Query<StudentsQueryParams>,
) -> Response {
    info!("GET /students");

    match s.db.list_students(params.q.as_deref()) {
        Ok(students) => (StatusCode::OK, Json(json!({ "ok": true, "students": students }))).into_response(),
        Err(e) => ApiErrorType::from(ServiceError::from(e)).into_response(),
    }
}
