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

const DEFAULT_FEATURE_KEY: &str = "allow-updates";

#[derive(Debug, Deserialize)]
pub struct FeatureQueryParams {
    pub key: Option<String>,
}

impl FeatureQueryParams {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_FEATURE_KEY)
    }
}

/// GET /feature
///
/// Returns how many votes a requested feature has.
pub async fn get_feature_votes(
    State(s): State<Arc<AppState>>,
    Query(params): Query<FeatureQueryParams>,
) -> Response {
    info!("GET /feature (key={})", params.key());

    match s.db.feature_votes(params.key()) {
        Ok(count) => (StatusCode::OK, Json(json!({ "ok": true, "count": count }))).into_response(),
        Err(e) => ApiErrorType::from(ServiceError::from(e)).into_response(),
    }
}

/// POST /feature
///
/// Adds one vote for a requested feature.
pub async fn post_feature_vote(
    State(s): State<Arc<AppState>>,
    Query(params): Query<FeatureQueryParams>,
) -> Response {
    info!("POST /feature (key={})", params.key());

    match s.db.increment_feature_votes(params.key()) {
        Ok(count) => (StatusCode::OK, Json(json!({ "ok": true, "count": count }))).into_response(),
        Err(e) => ApiErrorType::from(ServiceError::from(e)).into_response(),
    }
}
