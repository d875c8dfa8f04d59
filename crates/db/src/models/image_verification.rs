//! Image verification entity model and DTOs.

use faceverify_core::error::CoreError;
use faceverify_core::types::{DbId, Timestamp};
use faceverify_core::verdict::Verdict;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `image_verifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageVerification {
    pub id: DbId,
    pub image_path: String,
    pub verdict: String,
    pub confidence: f64,
    pub distance: Option<f64>,
    pub reference_profile_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl ImageVerification {
    pub fn verdict(&self) -> Result<Verdict, CoreError> {
        self.verdict.parse()
    }
}

/// DTO for recording a verified image.
#[derive(Debug, Clone)]
pub struct CreateImageVerification {
    pub image_path: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub distance: Option<f64>,
    pub reference_profile_id: Option<DbId>,
}
