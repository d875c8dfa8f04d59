//! Lifecycle of a single verification unit (one image or one sampled frame).
//!
//! ```text
//! Created --extracted(Some)--> Extracted --assign_verdict--> VerdictAssigned
//!         --extracted(None)--> NoFace    --assign_verdict--> VerdictAssigned
//! ```
//!
//! `VerdictAssigned` is terminal. There are no retries.

use crate::comparison::{compare, MatchResult, MatchThreshold};
use crate::descriptor::FaceDescriptor;
use crate::error::CoreError;
use crate::upload_path::UploadPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStage {
    Created,
    Extracted,
    NoFace,
    VerdictAssigned,
}

/// One image or frame moving through extraction and comparison.
#[derive(Debug, Clone)]
pub struct VerificationUnit {
    source: UploadPath,
    descriptor: Option<FaceDescriptor>,
    stage: UnitStage,
    result: Option<MatchResult>,
}

impl VerificationUnit {
    pub fn new(source: UploadPath) -> Self {
        Self {
            source,
            descriptor: None,
            stage: UnitStage::Created,
            result: None,
        }
    }

    pub fn source(&self) -> &UploadPath {
        &self.source
    }

    pub fn stage(&self) -> UnitStage {
        self.stage
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// Record the extractor outcome. `None` moves the unit to `NoFace`.
    pub fn extracted(&mut self, descriptor: Option<FaceDescriptor>) -> Result<(), CoreError> {
        if self.stage != UnitStage::Created {
            return Err(self.invalid_transition("extracted"));
        }
        self.stage = if descriptor.is_some() {
            UnitStage::Extracted
        } else {
            UnitStage::NoFace
        };
        self.descriptor = descriptor;
        Ok(())
    }

    /// Compare against the reference snapshot and fix the verdict.
    pub fn assign_verdict(
        &mut self,
        reference: Option<&FaceDescriptor>,
        threshold: MatchThreshold,
    ) -> Result<MatchResult, CoreError> {
        if !matches!(self.stage, UnitStage::Extracted | UnitStage::NoFace) {
            return Err(self.invalid_transition("assign_verdict"));
        }
        let result = compare(reference, self.descriptor.as_ref(), threshold)?;
        self.stage = UnitStage::VerdictAssigned;
        self.result = Some(result);
        Ok(result)
    }

    fn invalid_transition(&self, action: &str) -> CoreError {
        CoreError::Internal(format!(
            "Cannot apply '{action}' to unit {} in stage {:?}",
            self.source, self.stage
        ))
    }
}
