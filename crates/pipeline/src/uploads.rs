//! Upload file storage.
//!
//! Writes client uploads under the upload root with generated names
//! (`img_<uuid>.jpg`, `vid_<uuid>.mp4`, ...) and hands back the typed
//! relative [`UploadPath`].

use std::path::{Path, PathBuf};

use faceverify_core::upload_path::{client_extension, UploadNamespace, UploadPath};
use uuid::Uuid;

use crate::error::UploadError;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename as sent by the client. Only its extension is used.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the namespace directories.
    pub async fn ensure_layout(&self) -> Result<(), UploadError> {
        for ns in [
            UploadNamespace::Truth,
            UploadNamespace::Images,
            UploadNamespace::Videos,
        ] {
            tokio::fs::create_dir_all(self.root.join(ns.dir())).await?;
        }
        tokio::fs::create_dir_all(self.root.join("frames")).await?;
        Ok(())
    }

    /// Absolute location of a stored upload.
    pub fn resolve(&self, path: &UploadPath) -> PathBuf {
        path.resolve(&self.root)
    }

    /// Write `upload` into `namespace` under a fresh unique name.
    pub async fn save(
        &self,
        namespace: UploadNamespace,
        upload: &Upload,
    ) -> Result<UploadPath, UploadError> {
        let ext = client_extension(&upload.filename)
            .unwrap_or_else(|| namespace.default_extension().to_string());
        let name = format!("{}_{}.{ext}", namespace.file_prefix(), Uuid::new_v4().simple());
        let path = UploadPath::in_namespace(namespace, &name)?;

        let absolute = self.resolve(&path);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&absolute, &upload.bytes).await?;

        tracing::debug!(path = %path, bytes = upload.bytes.len(), "Stored upload");
        Ok(path)
    }

    /// Relative directory frames of `video_job_id` are written to.
    pub fn frames_dir(&self, video_job_id: i64) -> Result<UploadPath, UploadError> {
        Ok(UploadPath::new(
            UploadNamespace::Frames { video_job_id }.dir(),
        )?)
    }
}
