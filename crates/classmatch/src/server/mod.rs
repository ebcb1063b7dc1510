use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::server::endpoints::{classes, feature, matches, status, students, upload};
use crate::types::AppState;

mod endpoints;
mod types;
mod util;

pub use types::ApiErrorType;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The pages are served separately and call the API cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/classes", get(classes::get_classes))
        .route("/matches", get(matches::get_matches))
        .route("/match-detail", get(matches::get_match_detail))
        .route("/students", get(students::get_students))
        .route("/upload", post(upload::post_upload))
        .route(
            "/feature",
            get(feature::get_feature_votes).post(feature::post_feature_vote),
        )
        .layer(cors)
        .with_state(app_state)
}
