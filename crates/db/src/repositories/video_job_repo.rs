//! Repository for the `video_jobs` table.

use faceverify_core::types::DbId;
use sqlx::PgPool;

use crate::models::video_job::{CreateVideoJob, VideoJob, VideoJobStatus};

const COLUMNS: &str = "id, video_path, status, frame_count, error_message, \
    reference_profile_id, created_at, updated_at";

pub struct VideoJobRepo;

impl VideoJobRepo {
    /// Insert a job in `processing` state.
    pub async fn create(pool: &PgPool, input: &CreateVideoJob) -> Result<VideoJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO video_jobs (video_path, status, reference_profile_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoJob>(&query)
            .bind(&input.video_path)
            .bind(VideoJobStatus::Processing.as_str())
            .bind(input.reference_profile_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VideoJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_jobs WHERE id = $1");
        sqlx::query_as::<_, VideoJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job finished with the number of frames it produced.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        frame_count: i32,
    ) -> Result<VideoJob, sqlx::Error> {
        Self::finish(pool, id, VideoJobStatus::Completed, frame_count, None).await
    }

    /// Mark a job failed. Frames already recorded are kept.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        frame_count: i32,
        error_message: &str,
    ) -> Result<VideoJob, sqlx::Error> {
        Self::finish(
            pool,
            id,
            VideoJobStatus::Failed,
            frame_count,
            Some(error_message),
        )
        .await
    }

    async fn finish(
        pool: &PgPool,
        id: DbId,
        status: VideoJobStatus,
        frame_count: i32,
        error_message: Option<&str>,
    ) -> Result<VideoJob, sqlx::Error> {
        let query = format!(
            "UPDATE video_jobs
             SET status = $2, frame_count = $3, error_message = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoJob>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(frame_count)
            .bind(error_message)
            .fetch_one(pool)
            .await
    }

    /// All jobs, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<VideoJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM video_jobs ORDER BY id DESC");
        sqlx::query_as::<_, VideoJob>(&query).fetch_all(pool).await
    }
}
