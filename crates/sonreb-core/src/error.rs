//! # Error Types: Structured Error Hierarchy
//!
//! Every failure the engine can report is a typed variant carrying its
//! parameters. No variant formats user-facing prose beyond its `Display`;
//! the surrounding application owns messaging.
//!
//! ## Design
//!
//! - [`FitError`]: raised by the calibration fitter. `InsufficientData` is
//!   recoverable (collect more cores); `DegenerateFit` needs different data.
//! - [`PredictError`]: raised by the strength predictor before any
//!   arithmetic runs.
//! - [`ModelError`]: a stored or loaded model record that breaks its own
//!   invariants.
//! - [`SonrebError`]: top-level union for callers that handle both.
//!
//! Out-of-range inputs are warnings on a successful result, never errors.

use serde::Serialize;
use thiserror::Error;

use crate::identity::{PointId, ProjectId};
use crate::measurement::MeasurementField;

/// Top-level error type for the SonReb engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SonrebError {
    /// Model fitting failed.
    #[error("fit error: {0}")]
    Fit(#[from] FitError),

    /// Reading evaluation failed.
    #[error("prediction error: {0}")]
    Predict(#[from] PredictError),
}

/// Failure while fitting a calibration model.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitError {
    /// Fewer usable points than the minimum sample policy requires.
    #[error(
        "insufficient calibration data: {available} points available, {required} required ({needed} more needed)"
    )]
    InsufficientData {
        /// Policy minimum for the requested model form.
        required: usize,
        /// Points supplied.
        available: usize,
        /// Additional points the caller must collect.
        needed: usize,
    },

    /// The data cannot identify the model coefficients.
    #[error("degenerate fit: {0}")]
    DegenerateFit(DegenerateReason),

    /// A point carries a non-finite or out-of-domain value.
    #[error("calibration point {point_id} has invalid {field}: {value}")]
    InvalidPoint {
        /// Offending point.
        point_id: PointId,
        /// Offending field.
        field: MeasurementField,
        /// The rejected value.
        value: f64,
    },

    /// Carbonation was requested but a point has no carbonation depth.
    #[error("calibration point {point_id} has no carbonation depth")]
    PointMissingCarbonation {
        /// Offending point.
        point_id: PointId,
    },

    /// The supplied points belong to more than one project.
    #[error("calibration point {point_id} belongs to {found}, expected {expected}")]
    ProjectMismatch {
        /// Project of the first point.
        expected: ProjectId,
        /// Project of the offending point.
        found: ProjectId,
        /// Offending point.
        point_id: PointId,
    },
}

impl FitError {
    /// Build an `InsufficientData` error from the policy minimum and sample size.
    pub fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
            needed: required.saturating_sub(available),
        }
    }
}

/// Why a fit is degenerate.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegenerateReason {
    /// A regressor is exactly zero, so its logarithm is undefined.
    #[error("{field} is zero on point {point_id}")]
    ZeroValue {
        /// Offending point.
        point_id: PointId,
        /// Offending field.
        field: MeasurementField,
    },

    /// A regressor is constant across the sample.
    #[error("{field} has zero variance across the sample")]
    ZeroVariance {
        /// The constant field.
        field: MeasurementField,
    },

    /// Regressors are linearly dependent in log space.
    #[error("design matrix is rank deficient")]
    RankDeficient,

    /// The solver produced NaN or infinite coefficients.
    #[error("solver produced non-finite coefficients")]
    NonFiniteCoefficients,
}

/// Failure while scoring a reading.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictError {
    /// A reading input is non-positive, negative, or non-finite.
    #[error("invalid reading: {field} = {value}")]
    InvalidReading {
        /// Offending field.
        field: MeasurementField,
        /// The rejected value.
        value: f64,
    },

    /// The model includes the carbonation term but the reading omits it.
    #[error("model requires carbonation depth but the reading has none")]
    MissingCarbonation,
}

/// A calibration model record that is internally inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelError {
    /// `a3` must be present exactly when the carbonation term is used.
    #[error("carbonation exponent a3 does not match use_carbonation = {use_carbonation}")]
    CarbonationExponentMismatch {
        /// The model's declared form.
        use_carbonation: bool,
    },

    /// Carbonation range bounds must be present exactly when the term is used.
    #[error("carbonation range does not match use_carbonation = {use_carbonation}")]
    CarbonationRangeMismatch {
        /// The model's declared form.
        use_carbonation: bool,
    },

    /// A coefficient, statistic, or range bound is non-finite or out of domain.
    #[error("model field {field} has invalid value {value}")]
    InvalidValue {
        /// Wire name of the field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A calibrated range has `min > max`.
    #[error("calibrated {field} range is inverted: min {min} > max {max}")]
    InvertedRange {
        /// Measurement whose range is inverted.
        field: MeasurementField,
        /// Lower bound as stored.
        min: f64,
        /// Upper bound as stored.
        max: f64,
    },
}

impl SonrebError {
    /// Machine-readable kind, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fit(FitError::InsufficientData { .. }) => "insufficient_data",
            Self::Fit(FitError::DegenerateFit(_)) => "degenerate_fit",
            Self::Fit(FitError::InvalidPoint { .. }) => "invalid_point",
            Self::Fit(FitError::PointMissingCarbonation { .. }) => "point_missing_carbonation",
            Self::Fit(FitError::ProjectMismatch { .. }) => "project_mismatch",
            Self::Predict(PredictError::InvalidReading { .. }) => "invalid_reading",
            Self::Predict(PredictError::MissingCarbonation) => "missing_carbonation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_reports_points_needed() {
        let err = FitError::insufficient(8, 7);
        assert_eq!(
            err,
            FitError::InsufficientData {
                required: 8,
                available: 7,
                needed: 1
            }
        );
        assert!(err.to_string().contains("1 more needed"));
    }

    #[test]
    fn insufficient_never_underflows() {
        let err = FitError::insufficient(5, 9);
        assert!(matches!(err, FitError::InsufficientData { needed: 0, .. }));
    }

    #[test]
    fn fit_error_serializes_with_kind_tag() {
        let value = serde_json::to_value(FitError::insufficient(5, 3)).unwrap();
        assert_eq!(value["kind"], "insufficient_data");
        assert_eq!(value["needed"], 2);

        let value = serde_json::to_value(FitError::DegenerateFit(DegenerateReason::ZeroVariance {
            field: MeasurementField::Upv,
        }))
        .unwrap();
        assert_eq!(value["kind"], "degenerate_fit");
    }

    #[test]
    fn model_error_serializes_with_kind_tag() {
        let value = serde_json::to_value(ModelError::CarbonationExponentMismatch {
            use_carbonation: true,
        })
        .unwrap();
        assert_eq!(value["kind"], "carbonation_exponent_mismatch");
        assert_eq!(value["use_carbonation"], true);

        let err = ModelError::InvalidValue {
            field: "a0",
            value: f64::NAN,
        };
        assert!(err.to_string().contains("a0"));
    }

    #[test]
    fn predict_error_display() {
        let err = PredictError::InvalidReading {
            field: MeasurementField::Upv,
            value: -1.0,
        };
        assert_eq!(err.to_string(), "invalid reading: upv = -1");
        assert!(PredictError::MissingCarbonation
            .to_string()
            .contains("carbonation"));
    }

    #[test]
    fn top_level_kind_matches_serialized_tag() {
        let cases: Vec<SonrebError> = vec![
            FitError::insufficient(5, 1).into(),
            FitError::DegenerateFit(DegenerateReason::RankDeficient).into(),
            FitError::PointMissingCarbonation {
                point_id: PointId::new(),
            }
            .into(),
            PredictError::MissingCarbonation.into(),
            PredictError::InvalidReading {
                field: MeasurementField::ReboundIndex,
                value: 0.0,
            }
            .into(),
        ];
        for err in cases {
            let tag = match &err {
                SonrebError::Fit(e) => serde_json::to_value(e).unwrap()["kind"].clone(),
                SonrebError::Predict(e) => serde_json::to_value(e).unwrap()["kind"].clone(),
            };
            assert_eq!(tag, err.kind());
        }
    }
}
