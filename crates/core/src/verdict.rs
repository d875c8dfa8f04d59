//! Verification verdicts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Categorical outcome of comparing one unit against the reference.
///
/// Persisted and serialized by the upper-case names (`MATCH`, `NO_MATCH`,
/// `NO_FACE`, `NO_TRUTH`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Distance within the threshold.
    Match,
    /// Distance above the threshold.
    NoMatch,
    /// A reference exists but the unit has no detectable face.
    NoFace,
    /// No reference was enrolled when the unit was compared.
    NoTruth,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::Match,
        Verdict::NoMatch,
        Verdict::NoFace,
        Verdict::NoTruth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Match => "MATCH",
            Verdict::NoMatch => "NO_MATCH",
            Verdict::NoFace => "NO_FACE",
            Verdict::NoTruth => "NO_TRUTH",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verdict::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown verdict '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        for verdict in Verdict::ALL {
            assert_eq!(verdict.as_str().parse::<Verdict>().unwrap(), verdict);
        }
    }

    #[test]
    fn test_serde_matches_as_str() {
        for verdict in Verdict::ALL {
            let json = serde_json::to_value(verdict).unwrap();
            assert_eq!(json, serde_json::Value::String(verdict.as_str().into()));
        }
    }

    #[test]
    fn test_unknown_verdict_rejected() {
        assert!("match".parse::<Verdict>().is_err());
        assert!("".parse::<Verdict>().is_err());
    }
}
