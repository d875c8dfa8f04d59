pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /truth-image            enrol reference (POST), active reference (GET)
/// /test-images            verify images (POST)
/// /test-videos            verify videos (POST)
/// /results                all recorded results (GET)
/// /video-jobs/{id}        one job with its frames (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/truth-image",
            get(handlers::reference::get_active).post(handlers::reference::enroll),
        )
        .route("/test-images", post(handlers::verification::verify_images))
        .route("/test-videos", post(handlers::verification::verify_videos))
        .route("/results", get(handlers::results::list_results))
        .route("/video-jobs/{id}", get(handlers::results::get_video_job))
}
