//! Shared response envelope and record views for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Stored records are
//! returned with a `public_url` next to their relative path.

use faceverify_core::upload_path::UploadPath;
use faceverify_db::models::frame_verification::FrameVerification;
use faceverify_db::models::image_verification::ImageVerification;
use faceverify_db::models::reference_profile::ReferenceProfile;
use faceverify_db::models::video_job::VideoJob;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// URL a stored upload is served from. `None` when the recorded path is
/// not a valid upload path.
pub fn public_url(relative: &str) -> Option<String> {
    match UploadPath::new(relative) {
        Ok(path) => Some(path.public_url()),
        Err(e) => {
            tracing::warn!(path = relative, error = %e, "Stored record has an invalid upload path");
            None
        }
    }
}

/// A stored record plus the URL of its file.
#[derive(Debug, Serialize)]
pub struct WithUrl<T: Serialize> {
    #[serde(flatten)]
    pub record: T,
    pub public_url: Option<String>,
}

impl From<ReferenceProfile> for WithUrl<ReferenceProfile> {
    fn from(record: ReferenceProfile) -> Self {
        let public_url = public_url(&record.image_path);
        Self { record, public_url }
    }
}

impl From<ImageVerification> for WithUrl<ImageVerification> {
    fn from(record: ImageVerification) -> Self {
        let public_url = public_url(&record.image_path);
        Self { record, public_url }
    }
}

impl From<VideoJob> for WithUrl<VideoJob> {
    fn from(record: VideoJob) -> Self {
        let public_url = public_url(&record.video_path);
        Self { record, public_url }
    }
}

impl From<FrameVerification> for WithUrl<FrameVerification> {
    fn from(record: FrameVerification) -> Self {
        let public_url = public_url(&record.frame_path);
        Self { record, public_url }
    }
}

/// Convert every record of a list.
pub fn with_urls<T: Serialize>(records: Vec<T>) -> Vec<WithUrl<T>>
where
    WithUrl<T>: From<T>,
{
    records.into_iter().map(WithUrl::from).collect()
}
