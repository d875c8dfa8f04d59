//! In-memory doubles for orchestrator tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use faceverify_core::descriptor::FaceDescriptor;
use faceverify_core::encoder::{EncoderError, FaceEncoder};
use faceverify_core::sampler::{FrameReader, SamplerError, VideoInfo, VideoSource};
use faceverify_core::types::DbId;
use faceverify_db::models::frame_verification::{CreateFrameVerification, FrameVerification};
use faceverify_db::models::image_verification::{CreateImageVerification, ImageVerification};
use faceverify_db::models::reference_profile::{CreateReferenceProfile, ReferenceProfile};
use faceverify_db::models::video_job::{CreateVideoJob, VideoJob, VideoJobStatus};
use image::{DynamicImage, RgbImage};
use sqlx::types::Json;

use crate::error::StoreError;
use crate::store::VerificationStore;

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Reads the descriptor straight out of the file: a JSON array of numbers.
/// `[]` means no face; anything unparsable is an encoder error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubEncoder;

impl FaceEncoder for StubEncoder {
    async fn encode(&self, image_path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|_| EncoderError::ImageNotFound(image_path.to_string_lossy().to_string()))?;
        let values: Vec<f64> =
            serde_json::from_slice(&bytes).map_err(|e| EncoderError::Output(e.to_string()))?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(FaceDescriptor::new(values)?))
    }
}

/// [`StubEncoder`] that takes `delay` per image.
#[derive(Debug, Clone, Copy)]
pub struct SlowEncoder {
    pub delay: Duration,
}

impl FaceEncoder for SlowEncoder {
    async fn encode(&self, image_path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        tokio::time::sleep(self.delay).await;
        StubEncoder.encode(image_path).await
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    next_id: DbId,
    references: Vec<ReferenceProfile>,
    images: Vec<ImageVerification>,
    jobs: Vec<VideoJob>,
    frames: Vec<FrameVerification>,
    image_calls: usize,
    fail_image_call: Option<usize>,
    frame_calls: usize,
    fail_frame_call: Option<usize>,
    enroll_after_image_call: Option<(usize, Vec<f64>)>,
    fail_active_reads: bool,
}

impl State {
    fn id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn push_reference(&mut self, image_path: String, descriptor: FaceDescriptor) -> ReferenceProfile {
        let profile = ReferenceProfile {
            id: self.id(),
            image_path,
            dimension: i32::try_from(descriptor.dimension()).unwrap_or(i32::MAX),
            descriptor: Json(descriptor),
            created_at: Utc::now(),
        };
        self.references.push(profile.clone());
        profile
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    /// Number of `active_reference` calls.
    pub active_reads: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Make the `n`th `record_image` call (1-based) fail.
    pub fn fail_image_record(&self, n: usize) {
        self.state.lock().unwrap().fail_image_call = Some(n);
    }

    /// Make the `n`th `record_frame` call (1-based) fail.
    pub fn fail_frame_record(&self, n: usize) {
        self.state.lock().unwrap().fail_frame_call = Some(n);
    }

    /// Enrol a new reference right after the `n`th `record_image` call.
    pub fn enroll_on_record(&self, n: usize, values: &[f64]) {
        self.state.lock().unwrap().enroll_after_image_call = Some((n, values.to_vec()));
    }

    pub fn fail_active_reads(&self) {
        self.state.lock().unwrap().fail_active_reads = true;
    }

    pub fn images(&self) -> Vec<ImageVerification> {
        self.state.lock().unwrap().images.clone()
    }

    pub fn jobs(&self) -> Vec<VideoJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    fn finish_job(
        &self,
        id: DbId,
        status: VideoJobStatus,
        frame_count: i32,
        error_message: Option<&str>,
    ) -> Result<VideoJob, StoreError> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::Other(format!("no video job {id}")))?;
        job.status = status.as_str().to_string();
        job.frame_count = frame_count;
        job.error_message = error_message.map(str::to_string);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

impl VerificationStore for InMemoryStore {
    async fn create_reference(
        &self,
        input: &CreateReferenceProfile,
    ) -> Result<ReferenceProfile, StoreError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.push_reference(input.image_path.clone(), input.descriptor.clone()))
    }

    async fn active_reference(&self) -> Result<Option<ReferenceProfile>, StoreError> {
        self.active_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_active_reads {
            return Err(StoreError::Other("connection refused".into()));
        }
        Ok(state.references.iter().max_by_key(|r| r.id).cloned())
    }

    async fn record_image(
        &self,
        input: &CreateImageVerification,
    ) -> Result<ImageVerification, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.image_calls += 1;
        let call = state.image_calls;
        if state.fail_image_call == Some(call) {
            return Err(StoreError::Other("insert rejected".into()));
        }

        let record = ImageVerification {
            id: state.id(),
            image_path: input.image_path.clone(),
            verdict: input.verdict.as_str().to_string(),
            confidence: input.confidence,
            distance: input.distance,
            reference_profile_id: input.reference_profile_id,
            created_at: Utc::now(),
        };
        state.images.push(record.clone());

        if let Some((n, values)) = state.enroll_after_image_call.clone() {
            if n == call {
                let descriptor = FaceDescriptor::new(values)
                    .map_err(|e| StoreError::Other(e.to_string()))?;
                state.push_reference("truth/late.jpg".into(), descriptor);
            }
        }
        Ok(record)
    }

    async fn create_video_job(&self, input: &CreateVideoJob) -> Result<VideoJob, StoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let job = VideoJob {
            id: state.id(),
            video_path: input.video_path.clone(),
            status: VideoJobStatus::Processing.as_str().to_string(),
            frame_count: 0,
            error_message: None,
            reference_profile_id: input.reference_profile_id,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn record_frame(
        &self,
        input: &CreateFrameVerification,
    ) -> Result<FrameVerification, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.frame_calls += 1;
        if state.fail_frame_call == Some(state.frame_calls) {
            return Err(StoreError::Other("insert rejected".into()));
        }

        let record = FrameVerification {
            id: state.id(),
            video_job_id: input.video_job_id,
            frame_path: input.frame_path.clone(),
            second_offset: input.second_offset,
            frame_index: input.frame_index,
            verdict: input.verdict.as_str().to_string(),
            confidence: input.confidence,
            distance: input.distance,
            created_at: Utc::now(),
        };
        state.frames.push(record.clone());
        Ok(record)
    }

    async fn complete_video_job(&self, id: DbId, frame_count: i32) -> Result<VideoJob, StoreError> {
        self.finish_job(id, VideoJobStatus::Completed, frame_count, None)
    }

    async fn fail_video_job(
        &self,
        id: DbId,
        frame_count: i32,
        error_message: &str,
    ) -> Result<VideoJob, StoreError> {
        self.finish_job(id, VideoJobStatus::Failed, frame_count, Some(error_message))
    }
}

// ---------------------------------------------------------------------------
// Video source
// ---------------------------------------------------------------------------

/// Treats the uploaded file as a script such as `fps=30;frames=300`. Files
/// that do not parse fail to open.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedVideos;

pub struct ScriptedReader {
    info: VideoInfo,
}

fn parse_script(script: &str) -> Option<VideoInfo> {
    let mut info = VideoInfo::default();
    for part in script.trim().split(';') {
        let (key, value) = part.split_once('=')?;
        match key {
            "fps" => info.fps = Some(value.parse().ok()?),
            "frames" => info.frame_count = Some(value.parse().ok()?),
            _ => return None,
        }
    }
    Some(info)
}

impl VideoSource for ScriptedVideos {
    type Reader = ScriptedReader;

    async fn open(&self, path: &Path) -> Result<ScriptedReader, SamplerError> {
        let open_err = |reason: &str| SamplerError::Open {
            path: path.to_string_lossy().to_string(),
            reason: reason.to_string(),
        };
        let script = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| open_err(&e.to_string()))?;
        let info = parse_script(&script).ok_or_else(|| open_err("unrecognised container"))?;
        Ok(ScriptedReader { info })
    }
}

impl FrameReader for ScriptedReader {
    fn info(&self) -> VideoInfo {
        self.info
    }

    async fn read_frame(&mut self, frame_index: u64) -> Option<DynamicImage> {
        let available = self.info.frame_count.unwrap_or(u64::MAX);
        (frame_index < available)
            .then(|| DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([90, 60, 30]))))
    }
}
