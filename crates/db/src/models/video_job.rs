//! Video job entity model, status values, and DTOs.

use faceverify_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Lifecycle of a video job: `processing` until the sampler finishes, then
/// `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobStatus {
    Processing,
    Completed,
    Failed,
}

impl VideoJobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoJobStatus::Processing => "processing",
            VideoJobStatus::Completed => "completed",
            VideoJobStatus::Failed => "failed",
        }
    }
}

/// A row from the `video_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoJob {
    pub id: DbId,
    pub video_path: String,
    pub status: String,
    pub frame_count: i32,
    pub error_message: Option<String>,
    pub reference_profile_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VideoJob {
    pub fn is_status(&self, status: VideoJobStatus) -> bool {
        self.status == status.as_str()
    }
}

/// DTO for creating a video job shell before sampling starts.
#[derive(Debug, Clone)]
pub struct CreateVideoJob {
    pub video_path: String,
    pub reference_profile_id: Option<DbId>,
}
