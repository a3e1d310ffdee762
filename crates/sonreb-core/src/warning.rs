//! # Range Warnings: Single Source of Truth
//!
//! A calibrated model is only trustworthy inside the input ranges it was
//! fitted on. When a reading falls outside them the predictor still returns
//! an estimate but attaches one of these flags. Flags are advisory: they are
//! never errors.
//!
//! The snake_case identifiers are the keys the report layer counts in its
//! warnings breakdown, so serde, `Display`, and `as_str` must agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An out-of-calibrated-range flag on a scored reading.
///
/// Ordered so that sets of warnings serialize deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeWarning {
    /// Rebound index below the calibrated minimum.
    RhLow,
    /// Rebound index above the calibrated maximum.
    RhHigh,
    /// Pulse velocity below the calibrated minimum.
    UpvLow,
    /// Pulse velocity above the calibrated maximum.
    UpvHigh,
    /// Carbonation depth below the calibrated minimum.
    CarbonationLow,
    /// Carbonation depth above the calibrated maximum.
    CarbonationHigh,
}

/// Total number of warning flags.
pub const RANGE_WARNING_COUNT: usize = 6;

impl RangeWarning {
    /// Returns every flag in canonical order.
    pub fn all() -> &'static [RangeWarning] {
        &[
            Self::RhLow,
            Self::RhHigh,
            Self::UpvLow,
            Self::UpvHigh,
            Self::CarbonationLow,
            Self::CarbonationHigh,
        ]
    }

    /// Returns the snake_case identifier for this flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RhLow => "rh_low",
            Self::RhHigh => "rh_high",
            Self::UpvLow => "upv_low",
            Self::UpvHigh => "upv_high",
            Self::CarbonationLow => "carbonation_low",
            Self::CarbonationHigh => "carbonation_high",
        }
    }
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeWarning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rh_low" => Ok(Self::RhLow),
            "rh_high" => Ok(Self::RhHigh),
            "upv_low" => Ok(Self::UpvLow),
            "upv_high" => Ok(Self::UpvHigh),
            "carbonation_low" => Ok(Self::CarbonationLow),
            "carbonation_high" => Ok(Self::CarbonationHigh),
            other => Err(format!("unknown range warning: {other:?}")),
        }
    }
}
