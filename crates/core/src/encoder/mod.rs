//! Face encoders: image in, descriptor of the first detected face out.
//!
//! [`FaceEncoder::encode`] returns `Ok(None)` when the image contains no
//! face. Unreadable images and model/process failures are reported as
//! [`EncoderError`]; callers decide whether that means "no face".

use std::future::Future;
use std::path::Path;

use crate::descriptor::FaceDescriptor;
use crate::error::CoreError;
use crate::subprocess::SubprocessError;

pub mod command;
pub mod geometry;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use command::CommandEncoder;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;

#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("encoder process error: {0}")]
    Process(#[from] SubprocessError),

    #[error("encoder exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("unparsable encoder output: {0}")]
    Output(String),

    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] CoreError),

    #[error("model error: {0}")]
    Model(String),
}

pub trait FaceEncoder: Send + Sync {
    /// Descriptor of the first face in the image at `image_path`.
    fn encode(
        &self,
        image_path: &Path,
    ) -> impl Future<Output = Result<Option<FaceDescriptor>, EncoderError>> + Send;
}

/// Encoder selected at startup from configuration.
pub enum ConfiguredEncoder {
    Command(CommandEncoder),
    #[cfg(feature = "onnx")]
    Onnx(OnnxEncoder),
}

impl ConfiguredEncoder {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfiguredEncoder::Command(_) => "command",
            #[cfg(feature = "onnx")]
            ConfiguredEncoder::Onnx(_) => "onnx",
        }
    }
}

impl FaceEncoder for ConfiguredEncoder {
    async fn encode(&self, image_path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        match self {
            ConfiguredEncoder::Command(enc) => enc.encode(image_path).await,
            #[cfg(feature = "onnx")]
            ConfiguredEncoder::Onnx(enc) => enc.encode(image_path).await,
        }
    }
}
