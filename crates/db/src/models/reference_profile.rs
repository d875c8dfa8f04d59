//! Reference profile entity model and DTOs.

use faceverify_core::descriptor::FaceDescriptor;
use faceverify_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `reference_profiles` table.
///
/// The descriptor is validated on load: a row holding an empty or
/// non-numeric array fails to decode.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReferenceProfile {
    pub id: DbId,
    pub image_path: String,
    #[serde(skip_serializing)]
    pub descriptor: Json<FaceDescriptor>,
    pub dimension: i32,
    pub created_at: Timestamp,
}

impl ReferenceProfile {
    pub fn descriptor(&self) -> &FaceDescriptor {
        &self.descriptor.0
    }
}

/// DTO for enrolling a new reference.
#[derive(Debug, Clone)]
pub struct CreateReferenceProfile {
    pub image_path: String,
    pub descriptor: FaceDescriptor,
}
