//! Handlers for test image and test video uploads.
//!
//! Both answer with every recorded unit plus the units that failed. Video
//! batches run on their own task, so a timed-out or disconnected request
//! leaves them running to the end.

use axum::extract::{Multipart, State};
use axum::Json;
use faceverify_core::types::DbId;
use faceverify_db::models::frame_verification::FrameVerification;
use faceverify_db::models::image_verification::ImageVerification;
use faceverify_db::models::video_job::VideoJob;
use faceverify_pipeline::{UnitFailure, VideoOutcome};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::multipart::collect_files;
use crate::response::{with_urls, DataResponse, WithUrl};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImageBatchResponse {
    pub reference_profile_id: Option<DbId>,
    pub results: Vec<WithUrl<ImageVerification>>,
    pub failures: Vec<UnitFailure>,
}

#[derive(Debug, Serialize)]
pub struct VideoResult {
    pub filename: String,
    pub job: WithUrl<VideoJob>,
    pub frames: Vec<WithUrl<FrameVerification>>,
}

impl From<VideoOutcome> for VideoResult {
    fn from(outcome: VideoOutcome) -> Self {
        Self {
            filename: outcome.filename,
            job: outcome.job.into(),
            frames: with_urls(outcome.frames),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoBatchResponse {
    pub videos: Vec<VideoResult>,
    pub failures: Vec<UnitFailure>,
}

/// POST /api/v1/test-images
///
/// Verify every file in the repeated multipart field `files`.
pub async fn verify_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<ImageBatchResponse>>> {
    let uploads = collect_files(&mut multipart, "files").await?;
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files provided in field 'files'".to_string()));
    }

    let report = state.verifier.verify_images(&uploads).await?;

    Ok(Json(DataResponse {
        data: ImageBatchResponse {
            reference_profile_id: report.reference_profile_id,
            results: with_urls(report.results),
            failures: report.failures,
        },
    }))
}

/// POST /api/v1/test-videos
///
/// Sample and verify every video in the repeated multipart field `files`.
/// A video that cannot be decoded ends up as a failed job; the others
/// still run. The response waits for the whole batch and is therefore
/// bounded by `REQUEST_TIMEOUT_SECS`; the batch itself is not.
pub async fn verify_videos(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<VideoBatchResponse>>> {
    let uploads = collect_files(&mut multipart, "files").await?;
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files provided in field 'files'".to_string()));
    }

    let report = state
        .verifier
        .spawn_video_batch(uploads)
        .await
        .map_err(|e| AppError::InternalError(format!("Video batch task failed: {e}")))?;

    Ok(Json(DataResponse {
        data: VideoBatchResponse {
            videos: report.videos.into_iter().map(VideoResult::from).collect(),
            failures: report.failures,
        },
    }))
}
