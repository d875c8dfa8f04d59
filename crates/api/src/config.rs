use std::path::PathBuf;
use std::time::Duration;

use faceverify_core::comparison::MatchThreshold;
use faceverify_core::encoder::{CommandEncoder, ConfiguredEncoder, EncoderError};
use faceverify_core::sampler::SamplerConfig;
use faceverify_pipeline::VerifierConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). A video batch that
    /// outlives it keeps running; only the response is lost, and results
    /// stay available from `/api/v1/results`.
    pub request_timeout_secs: u64,
    /// Root directory for stored uploads (default: `uploads`).
    pub upload_dir: PathBuf,
    /// Request body limit for upload routes (default: 500 MiB).
    pub max_upload_bytes: usize,
    pub verification: VerificationConfig,
    pub encoder: EncoderConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                      |
    /// | `UPLOAD_DIR`           | `uploads`                  |
    /// | `MAX_UPLOAD_BYTES`     | `524288000`                |
    ///
    /// See [`VerificationConfig::from_env`] and [`EncoderConfig::from_env`]
    /// for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_dir =
            PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "524288000".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            upload_dir,
            max_upload_bytes,
            verification: VerificationConfig::from_env(),
            encoder: EncoderConfig::from_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct VerificationConfig {
    pub threshold: MatchThreshold,
    pub sample_interval_secs: u32,
    pub max_video_seconds: Option<u32>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            threshold: MatchThreshold::default(),
            sample_interval_secs: 1,
            max_video_seconds: None,
        }
    }
}

impl VerificationConfig {
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `FACE_DISTANCE_THRESHOLD`    | `0.6`   |
    /// | `FRAME_SAMPLE_INTERVAL_SECS` | `1`     |
    /// | `MAX_VIDEO_SECONDS`          | unset   |
    pub fn from_env() -> Self {
        let threshold: f64 = std::env::var("FACE_DISTANCE_THRESHOLD")
            .unwrap_or_else(|_| "0.6".into())
            .parse()
            .expect("FACE_DISTANCE_THRESHOLD must be a valid f64");
        let threshold =
            MatchThreshold::new(threshold).expect("FACE_DISTANCE_THRESHOLD must be >= 0");

        let sample_interval_secs: u32 = std::env::var("FRAME_SAMPLE_INTERVAL_SECS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("FRAME_SAMPLE_INTERVAL_SECS must be a valid u32");
        assert!(
            sample_interval_secs >= 1,
            "FRAME_SAMPLE_INTERVAL_SECS must be at least 1"
        );

        let max_video_seconds = std::env::var("MAX_VIDEO_SECONDS").ok().map(|v| {
            v.parse::<u32>()
                .expect("MAX_VIDEO_SECONDS must be a valid u32")
        });

        Self {
            threshold,
            sample_interval_secs,
            max_video_seconds,
        }
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            threshold: self.threshold,
            sampler: SamplerConfig {
                interval_secs: self.sample_interval_secs,
                max_seconds: self.max_video_seconds,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Face encoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// External program printing descriptors as JSON.
    Command,
    /// In-process SCRFD + ArcFace (requires the `onnx` feature).
    Onnx,
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub kind: EncoderKind,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
    pub detection_score: f32,
}

impl EncoderConfig {
    /// | Env Var                     | Default                        |
    /// |-----------------------------|--------------------------------|
    /// | `FACE_ENCODER`              | `command`                      |
    /// | `FACE_ENCODER_COMMAND`      | `face-encoder`                 |
    /// | `FACE_ENCODER_ARGS`         | empty                          |
    /// | `FACE_ENCODER_TIMEOUT_SECS` | `60`                           |
    /// | `FACE_DETECTOR_MODEL`       | `models/scrfd_500m_bnkps.onnx` |
    /// | `FACE_RECOGNIZER_MODEL`     | `models/w600k_r50.onnx`        |
    /// | `FACE_DETECTION_SCORE`      | `0.5`                          |
    pub fn from_env() -> Self {
        let kind = match std::env::var("FACE_ENCODER")
            .unwrap_or_else(|_| "command".into())
            .as_str()
        {
            "command" => EncoderKind::Command,
            "onnx" => EncoderKind::Onnx,
            other => panic!("FACE_ENCODER must be 'command' or 'onnx', got '{other}'"),
        };

        let command = PathBuf::from(
            std::env::var("FACE_ENCODER_COMMAND").unwrap_or_else(|_| "face-encoder".into()),
        );

        let args: Vec<String> = std::env::var("FACE_ENCODER_ARGS")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let timeout_secs: u64 = std::env::var("FACE_ENCODER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("FACE_ENCODER_TIMEOUT_SECS must be a valid u64");

        let detector_model = PathBuf::from(
            std::env::var("FACE_DETECTOR_MODEL")
                .unwrap_or_else(|_| "models/scrfd_500m_bnkps.onnx".into()),
        );
        let recognizer_model = PathBuf::from(
            std::env::var("FACE_RECOGNIZER_MODEL")
                .unwrap_or_else(|_| "models/w600k_r50.onnx".into()),
        );

        let detection_score: f32 = std::env::var("FACE_DETECTION_SCORE")
            .unwrap_or_else(|_| "0.5".into())
            .parse()
            .expect("FACE_DETECTION_SCORE must be a valid f32");

        Self {
            kind,
            command,
            args,
            timeout_secs,
            detector_model,
            recognizer_model,
            detection_score,
        }
    }

    /// A command encoder running `program args.. <image>`.
    pub fn command(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            kind: EncoderKind::Command,
            command: program.into(),
            args,
            timeout_secs: 60,
            detector_model: PathBuf::from("models/scrfd_500m_bnkps.onnx"),
            recognizer_model: PathBuf::from("models/w600k_r50.onnx"),
            detection_score: 0.5,
        }
    }

    /// Instantiate the configured encoder. Loading ONNX models can fail;
    /// asking for `onnx` in a build without the feature is an error.
    pub fn build(&self) -> Result<ConfiguredEncoder, EncoderError> {
        match self.kind {
            EncoderKind::Command => Ok(ConfiguredEncoder::Command(CommandEncoder::new(
                self.command.clone(),
                self.args.clone(),
                Duration::from_secs(self.timeout_secs),
            ))),
            #[cfg(feature = "onnx")]
            EncoderKind::Onnx => Ok(ConfiguredEncoder::Onnx(
                faceverify_core::encoder::OnnxEncoder::load(
                    &self.detector_model,
                    &self.recognizer_model,
                    self.detection_score,
                )?,
            )),
            #[cfg(not(feature = "onnx"))]
            EncoderKind::Onnx => Err(EncoderError::Model(
                "FACE_ENCODER=onnx requires building with the `onnx` feature".into(),
            )),
        }
    }
}
