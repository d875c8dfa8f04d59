//! Pull-based frame sampler.
//!
//! Turns a video into a finite, single-pass sequence of still frames, one
//! per sampling interval (one per second by default). Every successful
//! [`FrameSampler::next`] call reads one frame, writes it as
//! `frame_{second:06}.jpg` into the output directory, and yields it.
//!
//! Two strategies, chosen when the source is opened:
//!
//! - **Known duration** (`floor(frame_count / fps) > 0`): for each second
//!   `s` seek to frame `round(s * fps)`. A failed read ends the sequence.
//! - **Unknown duration**: read from frame 0, stepping `round(fps)` frames
//!   per second, until a read fails.
//!
//! The opened reader is owned by the sampler and dropped as soon as the
//! sequence ends or fails.

use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::ffmpeg;

/// Frame rate assumed when the source does not report a usable one.
pub const DEFAULT_FPS: f64 = 25.0;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The source could not be opened at all. Nothing was produced.
    #[error("failed to open video {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("failed to encode frame for second {second}: {source}")]
    Encode {
        second: u64,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write frame {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sampler configuration: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Source abstraction
// ---------------------------------------------------------------------------

/// Stream properties reported by an opened source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoInfo {
    pub fps: Option<f64>,
    pub frame_count: Option<u64>,
}

impl VideoInfo {
    /// Reported fps, or [`DEFAULT_FPS`] when missing or non-positive.
    pub fn effective_fps(&self) -> f64 {
        self.fps
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(DEFAULT_FPS)
    }

    /// Whole seconds of video, `0` when unknown.
    pub fn duration_secs(&self) -> u64 {
        match self.frame_count {
            Some(frames) => (frames as f64 / self.effective_fps()).floor() as u64,
            None => 0,
        }
    }
}

/// An opened video that can decode frames by index.
pub trait FrameReader: Send {
    fn info(&self) -> VideoInfo;

    /// Decode the frame at `frame_index`. `None` on end of stream or any
    /// decode failure.
    fn read_frame(&mut self, frame_index: u64) -> impl Future<Output = Option<DynamicImage>> + Send;
}

/// Something that can open a video file for frame reads.
pub trait VideoSource: Send + Sync {
    type Reader: FrameReader;

    fn open(&self, path: &Path) -> impl Future<Output = Result<Self::Reader, SamplerError>> + Send;
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Seconds between sampled frames. Must be at least 1.
    pub interval_secs: u32,
    /// Stop after this many seconds of video.
    pub max_seconds: Option<u32>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            max_seconds: None,
        }
    }
}

/// One frame written by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    /// Absolute path of the written JPEG.
    pub frame_path: PathBuf,
    /// `frame_{second:06}.jpg`
    pub file_name: String,
    pub frame_index: u64,
    pub timestamp_sec: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    KnownDuration { duration_secs: u64 },
    UnknownDuration,
}

pub struct FrameSampler<R: FrameReader> {
    reader: Option<R>,
    output_dir: PathBuf,
    mode: SamplingMode,
    fps: f64,
    interval_secs: u64,
    /// Exclusive upper bound on `next_second`.
    limit_secs: Option<u64>,
    /// Frames advanced per step on the unknown-duration path.
    step_frames: u64,
    next_second: u64,
    next_index: u64,
    produced: usize,
}

/// File name for the frame sampled at `second`.
pub fn frame_file_name(second: u64) -> String {
    format!("frame_{second:06}.jpg")
}

impl<R: FrameReader> FrameSampler<R> {
    /// Open `video_path` through `source` and prepare `output_dir`.
    ///
    /// Fails before producing anything if the source cannot be opened.
    pub async fn open<S>(
        source: &S,
        video_path: &Path,
        output_dir: &Path,
        config: SamplerConfig,
    ) -> Result<Self, SamplerError>
    where
        S: VideoSource<Reader = R>,
    {
        if config.interval_secs == 0 {
            return Err(SamplerError::Config(
                "interval_secs must be at least 1".into(),
            ));
        }

        let reader = source.open(video_path).await?;
        let info = reader.info();
        let fps = info.effective_fps();
        let duration_secs = info.duration_secs();
        let max_seconds = config.max_seconds.map(u64::from);

        let (mode, limit_secs) = if duration_secs > 0 {
            let limit = max_seconds.map_or(duration_secs, |m| m.min(duration_secs));
            (SamplingMode::KnownDuration { duration_secs }, Some(limit))
        } else {
            (SamplingMode::UnknownDuration, max_seconds)
        };

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| SamplerError::Write {
                path: output_dir.to_string_lossy().to_string(),
                source: e,
            })?;

        let interval_secs = u64::from(config.interval_secs);
        let step_frames = ((fps * interval_secs as f64).round() as u64).max(1);

        tracing::debug!(
            video = %video_path.display(),
            fps,
            ?mode,
            ?limit_secs,
            "Frame sampler opened",
        );

        Ok(Self {
            reader: Some(reader),
            output_dir: output_dir.to_path_buf(),
            mode,
            fps,
            interval_secs,
            limit_secs,
            step_frames,
            next_second: 0,
            next_index: 0,
            produced: 0,
        })
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Frames yielded so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Whether the underlying reader is still held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Pull the next frame.
    ///
    /// `Ok(None)` once the sequence is exhausted, including after an early
    /// read failure. A failure writing the frame file is returned as an
    /// error and also ends the sequence.
    pub async fn next(&mut self) -> Result<Option<SampledFrame>, SamplerError> {
        if self.reader.is_none() {
            return Ok(None);
        }

        let second = self.next_second;
        if self.limit_secs.is_some_and(|limit| second >= limit) {
            self.release();
            return Ok(None);
        }

        let frame_index = match self.mode {
            SamplingMode::KnownDuration { .. } => (second as f64 * self.fps).round() as u64,
            SamplingMode::UnknownDuration => self.next_index,
        };

        let image = match self.reader.as_mut() {
            Some(reader) => reader.read_frame(frame_index).await,
            None => None,
        };
        let Some(image) = image else {
            tracing::debug!(second, frame_index, "Frame read failed, ending sequence");
            self.release();
            return Ok(None);
        };

        let file_name = frame_file_name(second);
        let frame_path = self.output_dir.join(&file_name);
        if let Err(e) = write_jpeg(&image, &frame_path, second).await {
            self.release();
            return Err(e);
        }

        self.next_second += self.interval_secs;
        self.next_index += self.step_frames;
        self.produced += 1;

        Ok(Some(SampledFrame {
            frame_path,
            file_name,
            frame_index,
            timestamp_sec: second,
        }))
    }

    /// Drain the remaining sequence into a vector.
    pub async fn collect_all(mut self) -> Result<Vec<SampledFrame>, SamplerError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next().await? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn release(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(produced = self.produced, "Frame sampler released reader");
        }
    }
}

impl<R: FrameReader> fmt::Debug for FrameSampler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSampler")
            .field("output_dir", &self.output_dir)
            .field("mode", &self.mode)
            .field("fps", &self.fps)
            .field("next_second", &self.next_second)
            .field("produced", &self.produced)
            .field("open", &self.reader.is_some())
            .finish_non_exhaustive()
    }
}

async fn write_jpeg(image: &DynamicImage, path: &Path, second: u64) -> Result<(), SamplerError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|source| SamplerError::Encode { second, source })?;

    tokio::fs::write(path, buf)
        .await
        .map_err(|source| SamplerError::Write {
            path: path.to_string_lossy().to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// FFmpeg-backed source
// ---------------------------------------------------------------------------

/// Production source: ffprobe for stream properties, one ffmpeg invocation
/// per frame read.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegSource;

pub struct FfmpegReader {
    path: PathBuf,
    info: VideoInfo,
}

impl VideoSource for FfmpegSource {
    type Reader = FfmpegReader;

    async fn open(&self, path: &Path) -> Result<FfmpegReader, SamplerError> {
        let probe = ffmpeg::probe_video(path)
            .await
            .map_err(|e| SamplerError::Open {
                path: path.to_string_lossy().to_string(),
                reason: e.to_string(),
            })?;

        let info = VideoInfo {
            fps: ffmpeg::parse_framerate(&probe),
            frame_count: ffmpeg::parse_frame_count(&probe),
        };

        Ok(FfmpegReader {
            path: path.to_path_buf(),
            info,
        })
    }
}

impl FrameReader for FfmpegReader {
    fn info(&self) -> VideoInfo {
        self.info
    }

    async fn read_frame(&mut self, frame_index: u64) -> Option<DynamicImage> {
        let timestamp = frame_index as f64 / self.info.effective_fps();
        match ffmpeg::extract_frame_png(&self.path, timestamp).await {
            Ok(Some(bytes)) => match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(frame_index, error = %e, "Failed to decode extracted frame");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(frame_index, error = %e, "ffmpeg frame extraction failed");
                None
            }
        }
    }
}
