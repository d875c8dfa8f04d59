pub mod frame_verification;
pub mod image_verification;
pub mod reference_profile;
pub mod video_job;
