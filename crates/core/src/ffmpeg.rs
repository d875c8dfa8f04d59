//! FFmpeg/FFprobe command utilities.
//!
//! Probing (frame rate, frame count) and single-frame extraction used by the
//! frame sampler's production video source.

use std::path::Path;

use serde::Deserialize;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("no video stream in {0}")]
    NoVideoStream(String),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let probe = serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))?;

    if first_video_stream(&probe).is_none() {
        return Err(FfmpegError::NoVideoStream(
            path.to_string_lossy().to_string(),
        ));
    }
    Ok(probe)
}

/// Decode the frame at `timestamp_secs` and return it PNG-encoded.
///
/// Returns `Ok(None)` when ffmpeg succeeds but emits nothing, which is what
/// happens when seeking past the last frame.
pub async fn extract_frame_png(
    video_path: &Path,
    timestamp_secs: f64,
) -> Result<Option<Vec<u8>>, FfmpegError> {
    let output = tokio::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{timestamp_secs:.6}"), "-i"])
        .arg(video_path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "image2pipe",
            "-vcodec",
            "png",
            "-",
        ])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    if output.stdout.is_empty() {
        Ok(None)
    } else {
        Ok(Some(output.stdout))
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> Option<f64> {
    let from_format = probe.format.duration.as_deref();
    let from_stream = first_video_stream(probe).and_then(|s| s.duration.as_deref());
    [from_format, from_stream]
        .into_iter()
        .flatten()
        .filter_map(|d| d.parse::<f64>().ok())
        .find(|secs| secs.is_finite() && *secs > 0.0)
}

/// Parse the video framerate from ffprobe output.
///
/// Prefers `r_frame_rate`, falling back to `avg_frame_rate`. Returns `None`
/// when neither is a positive number (ffprobe reports `0/0` for unknown).
pub fn parse_framerate(probe: &FfprobeOutput) -> Option<f64> {
    let stream = first_video_stream(probe)?;
    [stream.r_frame_rate.as_deref(), stream.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_fraction)
        .find(|fps| fps.is_finite() && *fps > 0.0)
}

/// `"30/1"`, `"24000/1001"` or a plain `"25"`. `None` for a zero
/// denominator or anything unparsable.
fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let den = den.trim().parse::<f64>().ok().filter(|d| *d != 0.0)?;
            Some(num.trim().parse::<f64>().ok()? / den)
        }
        None => s.trim().parse::<f64>().ok(),
    }
}

/// Total frame count from ffprobe output.
///
/// Uses the container's `nb_frames` when present, otherwise estimates from
/// duration * framerate. `None` when neither is known.
pub fn parse_frame_count(probe: &FfprobeOutput) -> Option<u64> {
    if let Some(n) = first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|nb| nb.parse::<u64>().ok())
        .filter(|n| *n > 0)
    {
        return Some(n);
    }
    let duration = parse_duration(probe)?;
    let fps = parse_framerate(probe)?;
    let estimate = (duration * fps).round();
    (estimate >= 1.0).then_some(estimate as u64)
}
