//! Distance comparator: turns a reference descriptor and a candidate
//! descriptor into a [`Verdict`] and a confidence percentage.
//!
//! Policy, in order:
//!
//! 1. No reference -> `NO_TRUTH`, confidence 0.
//! 2. No candidate face -> `NO_FACE`, confidence 0.
//! 3. Otherwise `MATCH` iff the Euclidean distance is `<=` the threshold,
//!    with confidence `clamp(0, 100, (1 - d / t) * 100)`.
//!
//! The threshold doubles as the normalisation range, so a distance exactly
//! at the threshold is a match with confidence 0.

use serde::Serialize;

use crate::descriptor::FaceDescriptor;
use crate::error::CoreError;
use crate::verdict::Verdict;

/// Default maximum distance at which two faces are the same person.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Decimal places kept on reported confidences.
pub const CONFIDENCE_DECIMALS: i32 = 2;

/// Decimal places kept on reported distances.
pub const DISTANCE_DECIMALS: i32 = 4;

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// A validated match threshold: finite and non-negative.
///
/// Smaller values make matching stricter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    pub fn new(value: f64) -> Result<Self, CoreError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::Validation(format!(
                "Match threshold must be a finite, non-negative number (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_MATCH_THRESHOLD)
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Outcome of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub verdict: Verdict,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub confidence: f64,
    /// Euclidean distance rounded to four decimals. Only present when both
    /// descriptors existed.
    pub distance: Option<f64>,
}

impl MatchResult {
    fn without_distance(verdict: Verdict) -> Self {
        Self {
            verdict,
            confidence: 0.0,
            distance: None,
        }
    }
}

/// Compare a candidate against the reference.
///
/// `reference` is absent when nothing has been enrolled yet; `candidate` is
/// absent when the unit had no detectable face. Descriptors of different
/// dimensionality are rejected rather than coerced.
pub fn compare(
    reference: Option<&FaceDescriptor>,
    candidate: Option<&FaceDescriptor>,
    threshold: MatchThreshold,
) -> Result<MatchResult, CoreError> {
    let Some(reference) = reference else {
        return Ok(MatchResult::without_distance(Verdict::NoTruth));
    };
    let Some(candidate) = candidate else {
        return Ok(MatchResult::without_distance(Verdict::NoFace));
    };

    let distance = reference.euclidean_distance(candidate)?;
    let verdict = if distance <= threshold.value() {
        Verdict::Match
    } else {
        Verdict::NoMatch
    };

    Ok(MatchResult {
        verdict,
        confidence: round_to(confidence_score(distance, threshold), CONFIDENCE_DECIMALS),
        distance: Some(round_to(distance, DISTANCE_DECIMALS)),
    })
}

/// Unrounded confidence for a distance under a threshold.
///
/// A zero threshold only admits identical descriptors, which score 100.
pub fn confidence_score(distance: f64, threshold: MatchThreshold) -> f64 {
    let t = threshold.value();
    if t == 0.0 {
        return if distance == 0.0 { 100.0 } else { 0.0 };
    }
    ((1.0 - distance / t) * 100.0).clamp(0.0, 100.0)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn desc(values: &[f64]) -> FaceDescriptor {
        FaceDescriptor::new(values.to_vec()).unwrap()
    }

    fn threshold(t: f64) -> MatchThreshold {
        MatchThreshold::new(t).unwrap()
    }

    #[test]
    fn test_no_reference_is_no_truth() {
        let candidate = desc(&[0.1, 0.2]);
        for t in [0.0, 0.3, 0.6, 10.0] {
            for c in [Some(&candidate), None] {
                let result = compare(None, c, threshold(t)).unwrap();
                assert_eq!(result.verdict, Verdict::NoTruth);
                assert_eq!(result.confidence, 0.0);
                assert_eq!(result.distance, None);
            }
        }
    }

    #[test]
    fn test_no_candidate_is_no_face() {
        let reference = desc(&[0.1, 0.2]);
        for t in [0.0, 0.6, 2.0] {
            let result = compare(Some(&reference), None, threshold(t)).unwrap();
            assert_eq!(result.verdict, Verdict::NoFace);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.distance, None);
        }
    }

    #[test]
    fn test_identical_descriptor_matches_at_any_threshold() {
        let x = desc(&[0.3, -0.2, 0.9]);
        for t in [0.0, 0.01, 0.6, 5.0] {
            let result = compare(Some(&x), Some(&x), threshold(t)).unwrap();
            assert_eq!(result.verdict, Verdict::Match);
            assert_eq!(result.confidence, 100.0);
            assert_eq!(result.distance, Some(0.0));
        }
    }

    #[test]
    fn test_distant_face_is_no_match_with_zero_confidence() {
        let reference = desc(&[0.0, 0.0]);
        let candidate = desc(&[0.9, 0.0]);
        let result = compare(Some(&reference), Some(&candidate), threshold(0.6)).unwrap();
        assert_eq!(result.verdict, Verdict::NoMatch);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.distance, Some(0.9));
    }

    #[test]
    fn test_distance_at_threshold_is_match_with_zero_confidence() {
        let reference = desc(&[0.0]);
        let candidate = desc(&[0.5]);
        let result = compare(Some(&reference), Some(&candidate), threshold(0.5)).unwrap();
        assert_eq!(result.verdict, Verdict::Match);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_confidence_rounding() {
        // d = 0.2, t = 0.6 -> 66.666..% -> 66.67
        let reference = desc(&[0.0]);
        let candidate = desc(&[0.2]);
        let result = compare(Some(&reference), Some(&candidate), threshold(0.6)).unwrap();
        assert_eq!(result.verdict, Verdict::Match);
        assert_eq!(result.confidence, 66.67);
        assert_eq!(result.distance, Some(0.2));
    }

    #[test]
    fn test_distance_rounded_to_four_places() {
        let reference = desc(&[0.0, 0.0]);
        let candidate = desc(&[0.123456, 0.0]);
        let result = compare(Some(&reference), Some(&candidate), threshold(0.6)).unwrap();
        assert_eq!(result.distance, Some(0.1235));
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let reference = desc(&[0.0, 0.0]);
        let candidate = desc(&[0.0, 0.0, 0.0]);
        assert_matches!(
            compare(Some(&reference), Some(&candidate), threshold(0.6)),
            Err(CoreError::DimensionMismatch { .. })
        );
    }

    #[test]
    fn test_confidence_formula_and_monotonicity() {
        let t = threshold(0.6);
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let d = step as f64 * 0.01;
            let c = confidence_score(d, t);
            let expected = ((1.0 - d / 0.6) * 100.0).clamp(0.0, 100.0);
            assert!((c - expected).abs() < 1e-9);
            assert!((0.0..=100.0).contains(&c));
            assert!(c <= previous, "confidence must not increase with distance");
            previous = c;
        }
    }

    #[test]
    fn test_zero_threshold_confidence() {
        let t = threshold(0.0);
        assert_eq!(confidence_score(0.0, t), 100.0);
        assert_eq!(confidence_score(0.0001, t), 0.0);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(MatchThreshold::new(0.0).is_ok());
        assert!(MatchThreshold::new(-0.1).is_err());
        assert!(MatchThreshold::new(f64::NAN).is_err());
        assert!(MatchThreshold::new(f64::INFINITY).is_err());
        assert_eq!(MatchThreshold::default().value(), DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235, 1), 1.2);
        assert_eq!(round_to(99.999, 2), 100.0);
    }
}
