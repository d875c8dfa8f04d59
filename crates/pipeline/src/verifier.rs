//! The verification orchestrator.
//!
//! Processing is sequential: one file, one frame at a time. Extraction
//! failures become `NO_FACE`. Failures saving or recording a single unit are
//! collected in the batch report and the batch moves on; units already
//! recorded stay recorded.

use std::sync::Arc;

use faceverify_core::comparison::{MatchResult, MatchThreshold};
use faceverify_core::descriptor::FaceDescriptor;
use faceverify_core::encoder::FaceEncoder;
use faceverify_core::sampler::{FrameSampler, SamplerConfig, VideoSource};
use faceverify_core::types::DbId;
use faceverify_core::unit::VerificationUnit;
use faceverify_core::upload_path::{UploadNamespace, UploadPath};
use faceverify_db::models::frame_verification::{CreateFrameVerification, FrameVerification};
use faceverify_db::models::image_verification::{CreateImageVerification, ImageVerification};
use faceverify_db::models::reference_profile::{CreateReferenceProfile, ReferenceProfile};
use faceverify_db::models::video_job::{CreateVideoJob, VideoJob};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{UploadError, VerifyError};
use crate::store::VerificationStore;
use crate::uploads::{Upload, UploadStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifierConfig {
    pub threshold: MatchThreshold,
    pub sampler: SamplerConfig,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A unit that could not be verified or recorded.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    /// Client filename, with `@<second>s` appended for video frames.
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ImageBatchReport {
    /// Reference every image in the batch was compared against.
    pub reference_profile_id: Option<DbId>,
    pub results: Vec<ImageVerification>,
    pub failures: Vec<UnitFailure>,
}

#[derive(Debug, Serialize)]
pub struct VideoOutcome {
    pub filename: String,
    pub job: VideoJob,
    pub frames: Vec<FrameVerification>,
}

#[derive(Debug, Serialize)]
pub struct VideoBatchReport {
    pub videos: Vec<VideoOutcome>,
    pub failures: Vec<UnitFailure>,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

pub struct Verifier<E, S, V> {
    encoder: E,
    store: S,
    videos: V,
    uploads: UploadStore,
    config: VerifierConfig,
}

impl<E, S, V> Verifier<E, S, V>
where
    E: FaceEncoder,
    S: VerificationStore,
    V: VideoSource,
{
    pub fn new(encoder: E, store: S, videos: V, uploads: UploadStore, config: VerifierConfig) -> Self {
        Self {
            encoder,
            store,
            videos,
            uploads,
            config,
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store a reference image and make its face the active reference.
    ///
    /// Fails with [`VerifyError::NoFaceInReference`] when no face is found;
    /// the uploaded file is kept for inspection.
    pub async fn enroll_reference(&self, upload: &Upload) -> Result<ReferenceProfile, VerifyError> {
        let image_path = self.uploads.save(UploadNamespace::Truth, upload).await?;

        let Some(descriptor) = self.extract(&image_path).await else {
            tracing::info!(path = %image_path, "Reference image has no detectable face");
            return Err(VerifyError::NoFaceInReference { image_path });
        };

        let profile = self
            .store
            .create_reference(&CreateReferenceProfile {
                image_path: image_path.to_string(),
                descriptor,
            })
            .await?;

        tracing::info!(
            reference_profile_id = profile.id,
            dimension = profile.dimension,
            "Reference enrolled",
        );
        Ok(profile)
    }

    /// Verify a batch of images against one reference snapshot.
    ///
    /// Only a failure to read the reference aborts the batch (before any
    /// unit is touched).
    pub async fn verify_images(&self, uploads: &[Upload]) -> Result<ImageBatchReport, VerifyError> {
        let reference = self.store.active_reference().await?;
        let reference_profile_id = reference.as_ref().map(|r| r.id);

        let mut results = Vec::with_capacity(uploads.len());
        let mut failures = Vec::new();

        for upload in uploads {
            match self.verify_image(upload, reference.as_ref()).await {
                Ok(record) => results.push(record),
                Err(e) => {
                    tracing::warn!(filename = %upload.filename, error = %e, "Image verification failed");
                    failures.push(UnitFailure {
                        filename: upload.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            images = results.len(),
            failed = failures.len(),
            ?reference_profile_id,
            "Image batch verified",
        );
        Ok(ImageBatchReport {
            reference_profile_id,
            results,
            failures,
        })
    }

    /// Verify each video frame by frame. The reference is read once per
    /// video, when that video's sampling starts.
    pub async fn verify_videos(&self, uploads: &[Upload]) -> VideoBatchReport {
        let mut videos = Vec::with_capacity(uploads.len());
        let mut failures = Vec::new();

        for upload in uploads {
            let outcome = self.verify_video(upload, &mut failures).await;
            match outcome {
                Ok(outcome) => videos.push(outcome),
                Err(e) => {
                    tracing::warn!(filename = %upload.filename, error = %e, "Video could not be started");
                    failures.push(UnitFailure {
                        filename: upload.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        VideoBatchReport { videos, failures }
    }

    /// Run [`Verifier::verify_videos`] on its own task.
    ///
    /// Dropping the returned handle detaches the batch instead of cancelling
    /// it, so every job it starts still ends as `completed` or `failed`.
    pub fn spawn_video_batch(self: &Arc<Self>, uploads: Vec<Upload>) -> JoinHandle<VideoBatchReport>
    where
        E: 'static,
        S: 'static,
        V: 'static,
    {
        let verifier = Arc::clone(self);
        tokio::spawn(async move { verifier.verify_videos(&uploads).await })
    }

    // -----------------------------------------------------------------------
    // Per-unit steps
    // -----------------------------------------------------------------------

    async fn verify_image(
        &self,
        upload: &Upload,
        reference: Option<&ReferenceProfile>,
    ) -> Result<ImageVerification, VerifyError> {
        let image_path = self.uploads.save(UploadNamespace::Images, upload).await?;
        let result = self.evaluate(image_path.clone(), reference).await?;

        let record = self
            .store
            .record_image(&CreateImageVerification {
                image_path: image_path.to_string(),
                verdict: result.verdict,
                confidence: result.confidence,
                distance: result.distance,
                reference_profile_id: reference.map(|r| r.id),
            })
            .await?;

        tracing::debug!(
            path = %image_path,
            verdict = %result.verdict,
            confidence = result.confidence,
            distance = ?result.distance,
            "Image verified",
        );
        Ok(record)
    }

    /// Run one video to completion. Errors returned here happen before a
    /// job exists; later failures end up on the job itself.
    async fn verify_video(
        &self,
        upload: &Upload,
        failures: &mut Vec<UnitFailure>,
    ) -> Result<VideoOutcome, VerifyError> {
        let video_path = self.uploads.save(UploadNamespace::Videos, upload).await?;
        let reference = self.store.active_reference().await?;

        let job = self
            .store
            .create_video_job(&CreateVideoJob {
                video_path: video_path.to_string(),
                reference_profile_id: reference.as_ref().map(|r| r.id),
            })
            .await?;
        let video_job_id = job.id;
        tracing::info!(video_job_id, path = %video_path, "Video job started");

        let frames_dir = self.uploads.frames_dir(video_job_id)?;
        let mut frames = Vec::new();

        let run = self
            .sample_and_verify(
                &video_path,
                &frames_dir,
                video_job_id,
                reference.as_ref(),
                &upload.filename,
                &mut frames,
                failures,
            )
            .await;

        let frame_count = i32::try_from(frames.len()).unwrap_or(i32::MAX);
        let finished = match run {
            Ok(()) => {
                tracing::info!(video_job_id, frame_count, "Video job completed");
                self.store.complete_video_job(video_job_id, frame_count).await
            }
            Err(e) => {
                tracing::error!(video_job_id, frame_count, error = %e, "Video job failed");
                failures.push(UnitFailure {
                    filename: upload.filename.clone(),
                    error: e.to_string(),
                });
                self.store
                    .fail_video_job(video_job_id, frame_count, &e.to_string())
                    .await
            }
        };

        let job = match finished {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(video_job_id, error = %e, "Failed to finalise video job");
                job
            }
        };

        Ok(VideoOutcome {
            filename: upload.filename.clone(),
            job,
            frames,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn sample_and_verify(
        &self,
        video_path: &UploadPath,
        frames_dir: &UploadPath,
        video_job_id: DbId,
        reference: Option<&ReferenceProfile>,
        filename: &str,
        frames: &mut Vec<FrameVerification>,
        failures: &mut Vec<UnitFailure>,
    ) -> Result<(), VerifyError> {
        let mut sampler = FrameSampler::open(
            &self.videos,
            &self.uploads.resolve(video_path),
            &self.uploads.resolve(frames_dir),
            self.config.sampler,
        )
        .await?;

        while let Some(frame) = sampler.next().await? {
            let second = frame.timestamp_sec;
            match self
                .verify_frame(frames_dir, video_job_id, reference, &frame.file_name, second, frame.frame_index)
                .await
            {
                Ok(record) => frames.push(record),
                Err(e) => {
                    tracing::warn!(video_job_id, second, error = %e, "Frame verification failed");
                    failures.push(UnitFailure {
                        filename: format!("{filename}@{second}s"),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn verify_frame(
        &self,
        frames_dir: &UploadPath,
        video_job_id: DbId,
        reference: Option<&ReferenceProfile>,
        file_name: &str,
        second: u64,
        frame_index: u64,
    ) -> Result<FrameVerification, VerifyError> {
        let frame_path = frames_dir.join(file_name).map_err(UploadError::from)?;
        let result = self.evaluate(frame_path.clone(), reference).await?;

        let record = self
            .store
            .record_frame(&CreateFrameVerification {
                video_job_id,
                frame_path: frame_path.to_string(),
                second_offset: i32::try_from(second).unwrap_or(i32::MAX),
                frame_index: i64::try_from(frame_index).unwrap_or(i64::MAX),
                verdict: result.verdict,
                confidence: result.confidence,
                distance: result.distance,
            })
            .await?;

        tracing::debug!(
            video_job_id,
            second,
            verdict = %result.verdict,
            confidence = result.confidence,
            "Frame verified",
        );
        Ok(record)
    }

    /// Extract and compare one unit against the reference snapshot.
    async fn evaluate(
        &self,
        source: UploadPath,
        reference: Option<&ReferenceProfile>,
    ) -> Result<MatchResult, VerifyError> {
        let descriptor = self.extract(&source).await;
        let mut unit = VerificationUnit::new(source);
        unit.extracted(descriptor)?;
        Ok(unit.assign_verdict(reference.map(|r| r.descriptor()), self.config.threshold)?)
    }

    async fn extract(&self, path: &UploadPath) -> Option<FaceDescriptor> {
        match self.encoder.encode(&self.uploads.resolve(path)).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Face extraction failed, treating as no face");
                None
            }
        }
    }
}
