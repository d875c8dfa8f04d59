use std::sync::Arc;

use faceverify_core::encoder::ConfiguredEncoder;
use faceverify_core::sampler::FfmpegSource;
use faceverify_pipeline::{PgVerificationStore, UploadStore, Verifier};

use crate::config::ServerConfig;

/// The verifier wired to PostgreSQL and ffmpeg.
pub type AppVerifier = Verifier<ConfiguredEncoder, PgVerificationStore, FfmpegSource>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: faceverify_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Verification orchestrator shared by the upload handlers.
    pub verifier: Arc<AppVerifier>,
}

impl AppState {
    pub fn new(pool: faceverify_db::DbPool, config: ServerConfig, encoder: ConfiguredEncoder) -> Self {
        let verifier = Verifier::new(
            encoder,
            PgVerificationStore::new(pool.clone()),
            FfmpegSource,
            UploadStore::new(config.upload_dir.clone()),
            config.verification.verifier_config(),
        );

        Self {
            pool,
            config: Arc::new(config),
            verifier: Arc::new(verifier),
        }
    }
}
