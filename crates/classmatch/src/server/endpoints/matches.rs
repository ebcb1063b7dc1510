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
use crate::matching::{self, MatchMode, StudentRef};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchesQueryParams {
    pub email: Option<String>,
    pub id: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchDetailQueryParams {
    #[serde(rename = "meEmail")]
    pub me_email: Option<String>,
    #[serde(rename = "otherId")]
    pub other_id: Option<String>,
    pub mode: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_mode(raw: Option<&str>) -> Result<MatchMode, ServiceError> {
    raw.map_or(Ok(MatchMode::default()), str::parse)
}

/// GET /matches
///
/// Lists students sharing courses (or, in `classes` mode, exact class times)
/// with the given student.
///
/// Query parameters:
/// - `email` or `id`: the student (`id` wins if both are given)
/// - `mode` (optional): `courses` (default) or `classes`
pub async fn get_matches(
    State(s): State<Arc<AppState>>,
    Query(params): Query<MatchesQueryParams>,
) -> Response {
    info!("GET /matches (mode={:?})", params.mode);

    let result = parse_mode(params.mode.as_deref()).and_then(|mode| {
        let subject = match (non_empty(params.id), non_empty(params.email)) {
            (Some(id), _) => StudentRef::Id(id),
            (None, Some(email)) => StudentRef::Email(email),
            (None, None) => return Err(ServiceError::validation("Provide email or id")),
        };
        matching::find_matches(&s.db, &subject, mode)
    });

    match result {
        Ok(matches) => (StatusCode::OK, Json(json!({ "ok": true, "matches": matches }))).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /match-detail
///
/// Returns, for each course two students share, the events each of them has.
///
/// Query parameters:
/// - `meEmail`: email of the asking student
/// - `otherId`: id of the other student
/// - `mode` (optional): `courses` (default) or `classes`
pub async fn get_match_detail(
    State(s): State<Arc<AppState>>,
    Query(params): Query<MatchDetailQueryParams>,
) -> Response {
    info!(
        "GET /match-detail (other_id={:?}, mode={:?})",
        params.other_id, params.mode
    );

    let result = parse_mode(params.mode.as_deref()).and_then(|mode| {
        match (non_empty(params.me_email), non_empty(params.other_id)) {
            (Some(me_email), Some(other_id)) => {
                matching::resolve_shared_detail(&s.db, &me_email, &other_id, mode)
            }
            _ => Err(ServiceError::validation("meEmail and otherId required")),
        }
    });

    match result {
        Ok(shared) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "sharedCourses": shared })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
