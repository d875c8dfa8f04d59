//! Storage seam for the orchestrator.
//!
//! [`VerificationStore::active_reference`] is the single way the pipeline
//! learns which reference is current. Callers read it once and hand the
//! snapshot down; nothing below the orchestrator reaches back into storage.

use std::future::Future;

use faceverify_core::types::DbId;
use faceverify_db::models::frame_verification::{CreateFrameVerification, FrameVerification};
use faceverify_db::models::image_verification::{CreateImageVerification, ImageVerification};
use faceverify_db::models::reference_profile::{CreateReferenceProfile, ReferenceProfile};
use faceverify_db::models::video_job::{CreateVideoJob, VideoJob};
use faceverify_db::repositories::{
    FrameVerificationRepo, ImageVerificationRepo, ReferenceProfileRepo, VideoJobRepo,
};
use faceverify_db::DbPool;

use crate::error::StoreError;

pub trait VerificationStore: Send + Sync {
    /// Append a reference. It becomes active immediately.
    fn create_reference(
        &self,
        input: &CreateReferenceProfile,
    ) -> impl Future<Output = Result<ReferenceProfile, StoreError>> + Send;

    /// Most recently created reference, if any.
    fn active_reference(
        &self,
    ) -> impl Future<Output = Result<Option<ReferenceProfile>, StoreError>> + Send;

    fn record_image(
        &self,
        input: &CreateImageVerification,
    ) -> impl Future<Output = Result<ImageVerification, StoreError>> + Send;

    fn create_video_job(
        &self,
        input: &CreateVideoJob,
    ) -> impl Future<Output = Result<VideoJob, StoreError>> + Send;

    fn record_frame(
        &self,
        input: &CreateFrameVerification,
    ) -> impl Future<Output = Result<FrameVerification, StoreError>> + Send;

    fn complete_video_job(
        &self,
        id: DbId,
        frame_count: i32,
    ) -> impl Future<Output = Result<VideoJob, StoreError>> + Send;

    fn fail_video_job(
        &self,
        id: DbId,
        frame_count: i32,
        error_message: &str,
    ) -> impl Future<Output = Result<VideoJob, StoreError>> + Send;
}

/// PostgreSQL-backed store. Every record is its own statement, so units
/// written before a failure stay committed.
#[derive(Clone)]
pub struct PgVerificationStore {
    pool: DbPool,
}

impl PgVerificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl VerificationStore for PgVerificationStore {
    async fn create_reference(
        &self,
        input: &CreateReferenceProfile,
    ) -> Result<ReferenceProfile, StoreError> {
        Ok(ReferenceProfileRepo::create(&self.pool, input).await?)
    }

    async fn active_reference(&self) -> Result<Option<ReferenceProfile>, StoreError> {
        Ok(ReferenceProfileRepo::find_active(&self.pool).await?)
    }

    async fn record_image(
        &self,
        input: &CreateImageVerification,
    ) -> Result<ImageVerification, StoreError> {
        Ok(ImageVerificationRepo::create(&self.pool, input).await?)
    }

    async fn create_video_job(&self, input: &CreateVideoJob) -> Result<VideoJob, StoreError> {
        Ok(VideoJobRepo::create(&self.pool, input).await?)
    }

    async fn record_frame(
        &self,
        input: &CreateFrameVerification,
    ) -> Result<FrameVerification, StoreError> {
        Ok(FrameVerificationRepo::create(&self.pool, input).await?)
    }

    async fn complete_video_job(&self, id: DbId, frame_count: i32) -> Result<VideoJob, StoreError> {
        Ok(VideoJobRepo::mark_completed(&self.pool, id, frame_count).await?)
    }

    async fn fail_video_job(
        &self,
        id: DbId,
        frame_count: i32,
        error_message: &str,
    ) -> Result<VideoJob, StoreError> {
        Ok(VideoJobRepo::mark_failed(&self.pool, id, frame_count, error_message).await?)
    }
}
