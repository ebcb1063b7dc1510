use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::rate_limit::enforce_rate_limit;
use crate::server::types::ApiErrorType;
use crate::server::util::client_identity;
use crate::types::AppState;
use crate::upload::{upload_calendar, UploadRequest};

const UPLOAD_SCOPE: &str = "upload";

/// POST /upload
///
/// Registers a student from their name, email, year and ICS calendar.
/// Rate limited per client before the body is looked at.
pub async fn post_upload(
    State(s): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    info!("POST /upload");

    let client = client_identity(&headers);
    let limited = enforce_rate_limit(
        &s.db,
        UPLOAD_SCOPE,
        &client,
        s.config.upload_policy(),
        Utc::now(),
    );

    let result = limited.and_then(|_| {
        let Json(request) = body.map_err(|e| {
            warn!("Rejected upload body: {}", e.body_text());
            ServiceError::validation(e.body_text())
        })?;
        upload_calendar(&s.db, request)
    });

    match result {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "courses": summary.courses,
                "events": summary.events,
            })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
