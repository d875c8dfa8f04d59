//! Domain logic for face verification.
//!
//! Everything here is free of HTTP and database concerns: descriptors and
//! the distance comparator, typed upload paths, the ffprobe/ffmpeg helpers,
//! the pull-based frame sampler, and the face encoder implementations.

pub mod comparison;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod sampler;
pub mod subprocess;
pub mod types;
pub mod unit;
pub mod upload_path;
pub mod verdict;
