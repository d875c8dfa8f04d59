//! Face descriptors (embeddings).
//!
//! A [`FaceDescriptor`] is the fixed-length vector a face encoder produces
//! for one detected face. The dimensionality depends on the model (128 for
//! dlib-style encoders, 512 for ArcFace) and is never mixed within one
//! comparison.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An immutable, non-empty vector of finite values describing one face.
///
/// Serializes as a bare JSON array so it can be stored in a JSONB column
/// and read back without a wrapper object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FaceDescriptor(Vec<f64>);

impl FaceDescriptor {
    /// Build a descriptor, rejecting empty vectors and non-finite values.
    pub fn new(values: Vec<f64>) -> Result<Self, CoreError> {
        if values.is_empty() {
            return Err(CoreError::Validation(
                "Face descriptor must not be empty".into(),
            ));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(CoreError::Validation(format!(
                "Face descriptor contains a non-finite value at index {pos}"
            )));
        }
        Ok(Self(values))
    }

    /// Build a descriptor from single-precision model output.
    pub fn from_f32(values: &[f32]) -> Result<Self, CoreError> {
        Self::new(values.iter().map(|&v| f64::from(v)).collect())
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean (L2) distance to `other`.
    ///
    /// Returns [`CoreError::DimensionMismatch`] when the two descriptors
    /// come from models with different output sizes.
    pub fn euclidean_distance(&self, other: &FaceDescriptor) -> Result<f64, CoreError> {
        if self.dimension() != other.dimension() {
            return Err(CoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(sum.sqrt())
    }
}

impl TryFrom<Vec<f64>> for FaceDescriptor {
    type Error = CoreError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FaceDescriptor> for Vec<f64> {
    fn from(descriptor: FaceDescriptor) -> Self {
        descriptor.0
    }
}
