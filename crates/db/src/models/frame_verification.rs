//! Frame verification entity model and DTOs.

use faceverify_core::error::CoreError;
use faceverify_core::types::{DbId, Timestamp};
use faceverify_core::verdict::Verdict;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `frame_verifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FrameVerification {
    pub id: DbId,
    pub video_job_id: DbId,
    pub frame_path: String,
    pub second_offset: i32,
    pub frame_index: i64,
    pub verdict: String,
    pub confidence: f64,
    pub distance: Option<f64>,
    pub created_at: Timestamp,
}

impl FrameVerification {
    pub fn verdict(&self) -> Result<Verdict, CoreError> {
        self.verdict.parse()
    }
}

/// DTO for recording one verified frame.
#[derive(Debug, Clone)]
pub struct CreateFrameVerification {
    pub video_job_id: DbId,
    pub frame_path: String,
    pub second_offset: i32,
    pub frame_index: i64,
    pub verdict: Verdict,
    pub confidence: f64,
    pub distance: Option<f64>,
}
