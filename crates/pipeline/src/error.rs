use faceverify_core::error::CoreError;
use faceverify_core::sampler::SamplerError;
use faceverify_core::upload_path::{UploadPath, UploadPathError};

/// Failure of the result store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Other(String),
}

/// Failure writing an upload to disk.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Path(#[from] UploadPathError),
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The enrolment image has no detectable face. The file stays on disk.
    #[error("No face found in reference image")]
    NoFaceInReference { image_path: UploadPath },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),
}
