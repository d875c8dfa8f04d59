//! Verification orchestrator.
//!
//! Ties the encoder, comparator, and frame sampler from `faceverify_core` to
//! storage: uploads are written through [`uploads::UploadStore`], results
//! through a [`store::VerificationStore`]. The active reference is read
//! once per image batch and once per video, then passed down explicitly.

pub mod error;
pub mod store;
pub mod uploads;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use error::{StoreError, UploadError, VerifyError};
pub use store::{PgVerificationStore, VerificationStore};
pub use uploads::{Upload, UploadStore};
pub use verifier::{
    ImageBatchReport, UnitFailure, Verifier, VerifierConfig, VideoBatchReport, VideoOutcome,
};
