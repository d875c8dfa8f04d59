//! Repository layer: one zero-sized struct per table with async functions
//! taking `&PgPool`.

pub mod frame_verification_repo;
pub mod image_verification_repo;
pub mod reference_profile_repo;
pub mod video_job_repo;

pub use frame_verification_repo::FrameVerificationRepo;
pub use image_verification_repo::ImageVerificationRepo;
pub use reference_profile_repo::ReferenceProfileRepo;
pub use video_job_repo::VideoJobRepo;
