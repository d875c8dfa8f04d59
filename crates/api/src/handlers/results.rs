//! Read-only views over recorded verification results.

use axum::extract::{Path, State};
use axum::Json;
use faceverify_core::types::DbId;
use faceverify_db::models::frame_verification::FrameVerification;
use faceverify_db::models::image_verification::ImageVerification;
use faceverify_db::models::video_job::VideoJob;
use faceverify_db::repositories::{FrameVerificationRepo, ImageVerificationRepo, VideoJobRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::{with_urls, DataResponse, WithUrl};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub images: Vec<WithUrl<ImageVerification>>,
    pub videos: Vec<WithUrl<VideoJob>>,
    pub frames: Vec<WithUrl<FrameVerification>>,
}

#[derive(Debug, Serialize)]
pub struct VideoJobDetail {
    pub job: WithUrl<VideoJob>,
    pub frames: Vec<WithUrl<FrameVerification>>,
}

/// GET /api/v1/results
///
/// Every image result, video job and frame result, newest first.
pub async fn list_results(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ResultsResponse>>> {
    let images = ImageVerificationRepo::list(&state.pool).await?;
    let videos = VideoJobRepo::list(&state.pool).await?;
    let frames = FrameVerificationRepo::list(&state.pool).await?;

    Ok(Json(DataResponse {
        data: ResultsResponse {
            images: with_urls(images),
            videos: with_urls(videos),
            frames: with_urls(frames),
        },
    }))
}

/// GET /api/v1/video-jobs/{id}
///
/// One video job with its frames in playback order.
pub async fn get_video_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoJobDetail>>> {
    let job = VideoJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video job {id} not found")))?;
    let frames = FrameVerificationRepo::list_by_job(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: VideoJobDetail {
            job: job.into(),
            frames: with_urls(frames),
        },
    }))
}
