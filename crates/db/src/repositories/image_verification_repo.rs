//! Repository for the `image_verifications` table.

use sqlx::PgPool;

use crate::models::image_verification::{CreateImageVerification, ImageVerification};

const COLUMNS: &str =
    "id, image_path, verdict, confidence, distance, reference_profile_id, created_at";

pub struct ImageVerificationRepo;

impl ImageVerificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateImageVerification,
    ) -> Result<ImageVerification, sqlx::Error> {
        let query = format!(
            "INSERT INTO image_verifications
                (image_path, verdict, confidence, distance, reference_profile_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageVerification>(&query)
            .bind(&input.image_path)
            .bind(input.verdict.as_str())
            .bind(input.confidence)
            .bind(input.distance)
            .bind(input.reference_profile_id)
            .fetch_one(pool)
            .await
    }

    /// All image results, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ImageVerification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM image_verifications ORDER BY id DESC");
        sqlx::query_as::<_, ImageVerification>(&query)
            .fetch_all(pool)
            .await
    }
}
