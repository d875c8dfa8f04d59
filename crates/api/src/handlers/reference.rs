//! Handlers for the reference ("truth") image.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use faceverify_db::models::reference_profile::ReferenceProfile;
use faceverify_db::repositories::ReferenceProfileRepo;

use crate::error::{AppError, AppResult};
use crate::multipart::collect_files;
use crate::response::{DataResponse, WithUrl};
use crate::state::AppState;

/// POST /api/v1/truth-image
///
/// Enrol the uploaded image (multipart field `file`) as the active
/// reference. Only the first file is used.
pub async fn enroll(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<WithUrl<ReferenceProfile>>>)> {
    let upload = collect_files(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No file provided in field 'file'".to_string()))?;

    let profile = state.verifier.enroll_reference(&upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: profile.into(),
        }),
    ))
}

/// GET /api/v1/truth-image
pub async fn get_active(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<WithUrl<ReferenceProfile>>>> {
    let profile = ReferenceProfileRepo::find_active(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No reference image has been uploaded".to_string()))?;

    Ok(Json(DataResponse {
        data: profile.into(),
    }))
}
