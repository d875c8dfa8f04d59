//! Typed paths of stored uploads, relative to the upload root.
//!
//! An [`UploadPath`] is produced once, when a file is written, and carries
//! everything later stages need: the absolute location under a given root
//! and the public URL it is served from. Nothing downstream inspects path
//! strings to recover the relative part.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// URL prefix stored files are served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadPathError {
    #[error("upload path is empty")]
    Empty,

    #[error("upload path must be relative: {0}")]
    Absolute(String),

    #[error("upload path must not contain '..' or '.' segments: {0}")]
    Traversal(String),
}

/// Directory an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadNamespace {
    Truth,
    Images,
    Videos,
    /// Frames sampled from one video job.
    Frames { video_job_id: i64 },
}

impl UploadNamespace {
    pub fn dir(self) -> String {
        match self {
            UploadNamespace::Truth => "truth".into(),
            UploadNamespace::Images => "images".into(),
            UploadNamespace::Videos => "videos".into(),
            UploadNamespace::Frames { video_job_id } => format!("frames/video_{video_job_id}"),
        }
    }

    /// Filename prefix for generated names.
    pub fn file_prefix(self) -> &'static str {
        match self {
            UploadNamespace::Truth => "truth",
            UploadNamespace::Images => "img",
            UploadNamespace::Videos => "vid",
            UploadNamespace::Frames { .. } => "frame",
        }
    }

    /// Extension used when the client filename has none.
    pub fn default_extension(self) -> &'static str {
        match self {
            UploadNamespace::Videos => "mp4",
            _ => "jpg",
        }
    }
}

/// A validated, forward-slash separated path relative to the upload root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UploadPath(String);

impl UploadPath {
    pub fn new(relative: impl Into<String>) -> Result<Self, UploadPathError> {
        let raw: String = relative.into();
        let normalized = raw.replace('\\', "/");
        let trimmed = normalized.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(UploadPathError::Empty);
        }
        if trimmed.starts_with('/') || Path::new(trimmed).has_root() {
            return Err(UploadPathError::Absolute(raw));
        }
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(_) => {}
                Component::Prefix(_) | Component::RootDir => {
                    return Err(UploadPathError::Absolute(raw))
                }
                Component::ParentDir | Component::CurDir => {
                    return Err(UploadPathError::Traversal(raw))
                }
            }
        }
        if trimmed.split('/').any(|seg| seg == "." || seg.is_empty()) {
            return Err(UploadPathError::Traversal(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Path of a file inside `namespace`.
    pub fn in_namespace(
        namespace: UploadNamespace,
        file_name: &str,
    ) -> Result<Self, UploadPathError> {
        Self::new(format!("{}/{file_name}", namespace.dir()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Child path, e.g. a frame file inside a frames directory.
    pub fn join(&self, child: &str) -> Result<Self, UploadPathError> {
        Self::new(format!("{}/{child}", self.0))
    }

    /// Absolute location under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |p, seg| p.join(seg))
    }

    /// URL the file is served from, e.g. `/uploads/images/img_x.jpg`.
    pub fn public_url(&self) -> String {
        format!("{PUBLIC_PREFIX}/{}", self.0)
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for UploadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UploadPath {
    type Error = UploadPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UploadPath> for String {
    fn from(path: UploadPath) -> Self {
        path.0
    }
}

/// Lower-cased extension of a client-supplied filename, without the dot.
///
/// Only short alphanumeric extensions are kept so generated names stay
/// filesystem-safe.
pub fn client_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
