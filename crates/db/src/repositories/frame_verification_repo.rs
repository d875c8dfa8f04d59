//! Repository for the `frame_verifications` table.

use faceverify_core::types::DbId;
use sqlx::PgPool;

use crate::models::frame_verification::{CreateFrameVerification, FrameVerification};

const COLUMNS: &str = "id, video_job_id, frame_path, second_offset, frame_index, verdict, \
    confidence, distance, created_at";

pub struct FrameVerificationRepo;

impl FrameVerificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateFrameVerification,
    ) -> Result<FrameVerification, sqlx::Error> {
        let query = format!(
            "INSERT INTO frame_verifications
                (video_job_id, frame_path, second_offset, frame_index, verdict, confidence, distance)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FrameVerification>(&query)
            .bind(input.video_job_id)
            .bind(&input.frame_path)
            .bind(input.second_offset)
            .bind(input.frame_index)
            .bind(input.verdict.as_str())
            .bind(input.confidence)
            .bind(input.distance)
            .fetch_one(pool)
            .await
    }

    /// Frames of one job in sampling order.
    pub async fn list_by_job(
        pool: &PgPool,
        video_job_id: DbId,
    ) -> Result<Vec<FrameVerification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM frame_verifications
             WHERE video_job_id = $1
             ORDER BY second_offset ASC"
        );
        sqlx::query_as::<_, FrameVerification>(&query)
            .bind(video_job_id)
            .fetch_all(pool)
            .await
    }

    /// All frame results, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<FrameVerification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM frame_verifications ORDER BY id DESC");
        sqlx::query_as::<_, FrameVerification>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_job(pool: &PgPool, video_job_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM frame_verifications WHERE video_job_id = $1")
                .bind(video_job_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
