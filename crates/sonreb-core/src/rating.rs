//! # Strength Rating
//!
//! Classifies an estimated strength as GOOD, FAIR, or POOR.
//!
//! Two policies exist and exactly one applies to any input:
//!
//! ```text
//! design_fc present and > 0  →  DesignRatio:        ratio = fc / design_fc
//!                                 GOOD ≥ 0.85, FAIR ≥ 0.70, else POOR
//! otherwise                  →  AbsoluteThreshold:  GOOD ≥ 21 MPa, FAIR ≥ 17 MPa, else POOR
//! ```
//!
//! The selection is a plain tagged choice made by [`RatingPolicy::select`];
//! [`classify_rating`] is the single entry point callers use.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative rating of an estimated strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    /// Meets or nearly meets the expected strength.
    Good,
    /// Noticeably below expectation; investigate.
    Fair,
    /// Well below expectation.
    Poor,
}

impl Rating {
    /// Returns the uppercase identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut-offs for both rating policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingThresholds {
    /// Minimum `fc / design_fc` ratio for GOOD.
    pub good_ratio: f64,
    /// Minimum `fc / design_fc` ratio for FAIR.
    pub fair_ratio: f64,
    /// Minimum absolute strength (MPa) for GOOD when no design strength is known.
    pub good_min_abs: f64,
    /// Minimum absolute strength (MPa) for FAIR when no design strength is known.
    pub fair_min_abs: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            good_ratio: 0.85,
            fair_ratio: 0.70,
            good_min_abs: 21.0,
            fair_min_abs: 17.0,
        }
    }
}

/// Which classification rule applies to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RatingPolicy {
    /// Compare against the project's design strength.
    DesignRatio {
        /// Design strength, MPa. Always > 0.
        design_fc: f64,
    },
    /// Compare against fixed absolute thresholds.
    AbsoluteThreshold,
}

impl RatingPolicy {
    /// Select the policy for the given design strength.
    ///
    /// Design-ratio whenever `design_fc` is present, finite, and positive;
    /// absolute thresholds otherwise.
    pub fn select(design_fc: Option<f64>) -> Self {
        match design_fc {
            Some(design_fc) if design_fc.is_finite() && design_fc > 0.0 => {
                Self::DesignRatio { design_fc }
            }
            _ => Self::AbsoluteThreshold,
        }
    }

    /// Classify an estimated strength under this policy.
    ///
    /// Total: a NaN estimate fails every comparison and rates POOR.
    pub fn classify(&self, estimated_fc: f64, thresholds: &RatingThresholds) -> Rating {
        let (value, good, fair) = match *self {
            Self::DesignRatio { design_fc } => (
                estimated_fc / design_fc,
                thresholds.good_ratio,
                thresholds.fair_ratio,
            ),
            Self::AbsoluteThreshold => (
                estimated_fc,
                thresholds.good_min_abs,
                thresholds.fair_min_abs,
            ),
        };
        if value >= good {
            Rating::Good
        } else if value >= fair {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }
}

/// Rate an estimated strength, choosing the policy from `design_fc`.
pub fn classify_rating(
    estimated_fc: f64,
    design_fc: Option<f64>,
    thresholds: &RatingThresholds,
) -> Rating {
    RatingPolicy::select(design_fc).classify(estimated_fc, thresholds)
}
