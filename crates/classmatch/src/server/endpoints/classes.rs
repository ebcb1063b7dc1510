use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::num::IntErrorKind;
use std::sync::Arc;
use tracing::info;

use crate::matching::{self, DEFAULT_MIN_GROUP_SIZE};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassesQueryParams {
    /// Substring the course code must contain
    pub course: Option<String>,
    #[serde(rename = "minSize")]
    pub min_size: Option<String>,
}

/// Missing or non-numeric values fall back to the default. Anything below 1
/// becomes 1 and values too large for `usize` saturate.
fn parse_min_size(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_MIN_GROUP_SIZE;
    };

    match raw.trim().parse::<i64>() {
        Ok(n) => usize::try_from(n.max(1)).unwrap_or(usize::MAX),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => usize::MAX,
            IntErrorKind::NegOverflow => 1,
            _ => DEFAULT_MIN_GROUP_SIZE,
        },
    }
}

/// GET /classes
///
/// Groups students sitting in the same class section.
///
/// Query parameters:
/// - `course` (optional): case-insensitive substring of the course code
/// - `minSize` (optional): smallest group to return, default 2
pub async fn get_classes(
    State(s): State<Arc<AppState>>,
    Query(params): Query<ClassesQueryParams>,
) -> Response {
    let min_size = parse_min_size(params.min_size.as_deref());
    info!(
        "GET /classes (course={:?}, min_size={})",
        params.course, min_size
    );

    match matching::group_classes(&s.db, params.course.as_deref(), min_size) {
        Ok(classes) => (StatusCode::OK, Json(json!({ "ok": true, "classes": classes }))).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
