//! # Calibration Model
//!
//! The SonReb power law and the fitted model record.
//!
//! ```text
//! fc = a0 · RH^a1 · UPV^a2              (base)
//! fc = a0 · RH^a1 · UPV^a2 · CD^a3      (with carbonation)
//! ```
//!
//! A [`CalibrationModel`] is produced once by the fitter and never mutated.
//! Its wire shape is flat (`a0`..`a3`, `upv_min`, `rh_max`, ...) to match the
//! persistence layer that stores it. Records read back from outside the
//! fitter go through [`CalibrationModel::validate`] before use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sonreb_core::{MeasurementField, ModelError, ModelId, ProjectId, RangeWarning};

// ---------------------------------------------------------------------------
// PowerLaw
// ---------------------------------------------------------------------------

/// Coefficients of the SonReb power law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLaw {
    /// Scale factor.
    pub a0: f64,
    /// Rebound index exponent.
    pub a1: f64,
    /// Pulse velocity exponent.
    pub a2: f64,
    /// Carbonation depth exponent; present iff the carbonation term is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a3: Option<f64>,
}

/// Global fallback used when a project has no active calibration.
///
/// RILEM NDT 4 SonReb relation, UPV in m/s, fc in MPa:
/// `fc = 9.27e-11 · RH^1.4 · UPV^2.6`.
pub const DEFAULT_POWER_LAW: PowerLaw = PowerLaw {
    a0: 9.27e-11,
    a1: 1.4,
    a2: 2.6,
    a3: None,
};

impl PowerLaw {
    /// Whether the carbonation term participates.
    pub fn uses_carbonation(&self) -> bool {
        self.a3.is_some()
    }

    /// Evaluate the law.
    ///
    /// The carbonation factor is applied only when both the exponent and a
    /// depth are present. Callers validate inputs; this is raw arithmetic.
    pub fn evaluate(&self, upv: f64, rebound_index: f64, carbonation_depth: Option<f64>) -> f64 {
        let base = self.a0 * rebound_index.powf(self.a1) * upv.powf(self.a2);
        match (self.a3, carbonation_depth) {
            (Some(a3), Some(cd)) => base * cd.powf(a3),
            _ => base,
        }
    }
}

// ---------------------------------------------------------------------------
// ValueRange
// ---------------------------------------------------------------------------

/// Closed interval of values observed during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
}

/// Position of a value relative to a [`ValueRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePosition {
    /// Strictly below `min`.
    Below,
    /// Inside `[min, max]`.
    Within,
    /// Strictly above `max`.
    Above,
}

impl ValueRange {
    /// Literal min/max of a sample. `None` for an empty sample.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(r) => Some(Self {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }

    /// Locate `value` against the interval.
    pub fn position(&self, value: f64) -> RangePosition {
        if value < self.min {
            RangePosition::Below
        } else if value > self.max {
            RangePosition::Above
        } else {
            RangePosition::Within
        }
    }

    /// Map an out-of-range position to the matching warning flag.
    pub fn check(&self, value: f64, low: RangeWarning, high: RangeWarning) -> Option<RangeWarning> {
        match self.position(value) {
            RangePosition::Below => Some(low),
            RangePosition::Above => Some(high),
            RangePosition::Within => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CalibrationModel
// ---------------------------------------------------------------------------

/// A fitted regression surface for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    /// Model identifier.
    pub id: ModelId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Scale factor.
    pub a0: f64,
    /// Rebound index exponent.
    pub a1: f64,
    /// Pulse velocity exponent.
    pub a2: f64,
    /// Carbonation exponent; present iff `use_carbonation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a3: Option<f64>,
    /// Coefficient of determination in MPa space. Not clamped; a pathological
    /// fit can be negative.
    pub r2: f64,
    /// Root-mean-square error in MPa.
    pub rmse: f64,
    /// Number of points included in the fit.
    pub points_used: usize,
    /// Whether the carbonation term was fitted.
    pub use_carbonation: bool,
    /// Calibrated UPV range, m/s.
    pub upv_min: f64,
    /// Calibrated UPV range, m/s.
    pub upv_max: f64,
    /// Calibrated rebound index range.
    pub rh_min: f64,
    /// Calibrated rebound index range.
    pub rh_max: f64,
    /// Calibrated carbonation range, mm; present iff `use_carbonation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbonation_min: Option<f64>,
    /// Calibrated carbonation range, mm; present iff `use_carbonation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbonation_max: Option<f64>,
    /// Generation time (UTC).
    pub created_at: DateTime<Utc>,
}

impl CalibrationModel {
    /// Check the record's internal consistency.
    ///
    /// `a3` and both carbonation bounds are present iff `use_carbonation`;
    /// every coefficient, statistic and bound is finite; `a0` is positive;
    /// `rmse` is non-negative; no range is inverted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.a3.is_some() != self.use_carbonation {
            return Err(ModelError::CarbonationExponentMismatch {
                use_carbonation: self.use_carbonation,
            });
        }
        let has_range = (self.carbonation_min.is_some(), self.carbonation_max.is_some());
        if has_range != (self.use_carbonation, self.use_carbonation) {
            return Err(ModelError::CarbonationRangeMismatch {
                use_carbonation: self.use_carbonation,
            });
        }

        let values = [
            ("a0", Some(self.a0)),
            ("a1", Some(self.a1)),
            ("a2", Some(self.a2)),
            ("a3", self.a3),
            ("r2", Some(self.r2)),
            ("rmse", Some(self.rmse)),
            ("upv_min", Some(self.upv_min)),
            ("upv_max", Some(self.upv_max)),
            ("rh_min", Some(self.rh_min)),
            ("rh_max", Some(self.rh_max)),
            ("carbonation_min", self.carbonation_min),
            ("carbonation_max", self.carbonation_max),
        ];
        for (field, value) in values {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(ModelError::InvalidValue { field, value });
            }
        }
        if self.a0 <= 0.0 {
            return Err(ModelError::InvalidValue {
                field: "a0",
                value: self.a0,
            });
        }
        if self.rmse < 0.0 {
            return Err(ModelError::InvalidValue {
                field: "rmse",
                value: self.rmse,
            });
        }

        let mut ranges = vec![
            (MeasurementField::Upv, self.upv_range()),
            (MeasurementField::ReboundIndex, self.rh_range()),
        ];
        ranges.extend(
            self.carbonation_range()
                .map(|range| (MeasurementField::CarbonationDepth, range)),
        );
        match ranges.into_iter().find(|(_, r)| r.min > r.max) {
            Some((field, r)) => Err(ModelError::InvertedRange {
                field,
                min: r.min,
                max: r.max,
            }),
            None => Ok(()),
        }
    }

    /// The model's coefficients as a [`PowerLaw`].
    pub fn power_law(&self) -> PowerLaw {
        PowerLaw {
            a0: self.a0,
            a1: self.a1,
            a2: self.a2,
            a3: if self.use_carbonation { self.a3 } else { None },
        }
    }

    /// Evaluate the fitted law without validation, warnings, or rating.
    pub fn predict_fc(&self, upv: f64, rebound_index: f64, carbonation_depth: Option<f64>) -> f64 {
        self.power_law()
            .evaluate(upv, rebound_index, carbonation_depth)
    }

    /// Calibrated UPV interval.
    pub fn upv_range(&self) -> ValueRange {
        ValueRange {
            min: self.upv_min,
            max: self.upv_max,
        }
    }

    /// Calibrated rebound index interval.
    pub fn rh_range(&self) -> ValueRange {
        ValueRange {
            min: self.rh_min,
            max: self.rh_max,
        }
    }

    /// Calibrated carbonation interval, when the carbonation term is used.
    pub fn carbonation_range(&self) -> Option<ValueRange> {
        if !self.use_carbonation {
            return None;
        }
        match (self.carbonation_min, self.carbonation_max) {
            (Some(min), Some(max)) => Some(ValueRange { min, max }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbonation_model() -> CalibrationModel {
        CalibrationModel {
            id: ModelId::new(),
            project_id: ProjectId::new(),
            a0: 1.0e-9,
            a1: 1.2,
            a2: 2.2,
            a3: Some(-0.1),
            r2: 0.9,
            rmse: 1.5,
            points_used: 8,
            use_carbonation: true,
            upv_min: 3800.0,
            upv_max: 4400.0,
            rh_min: 28.0,
            rh_max: 38.0,
            carbonation_min: Some(4.0),
            carbonation_max: Some(15.0),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn consistent_models_validate() {
        let model = carbonation_model();
        assert_eq!(model.validate(), Ok(()));

        let base = CalibrationModel {
            a3: None,
            use_carbonation: false,
            carbonation_min: None,
            carbonation_max: None,
            ..model
        };
        assert_eq!(base.validate(), Ok(()));

        // A negative r2 is a poor fit, not a broken record.
        assert_eq!(CalibrationModel { r2: -0.4, ..base }.validate(), Ok(()));
    }

    #[test]
    fn carbonation_flag_without_exponent_is_rejected() {
        let model = CalibrationModel {
            a3: None,
            carbonation_min: None,
            carbonation_max: None,
            ..carbonation_model()
        };
        assert_eq!(
            model.validate(),
            Err(ModelError::CarbonationExponentMismatch {
                use_carbonation: true
            })
        );

        let stray = CalibrationModel {
            use_carbonation: false,
            carbonation_min: None,
            carbonation_max: None,
            ..carbonation_model()
        };
        assert_eq!(
            stray.validate(),
            Err(ModelError::CarbonationExponentMismatch {
                use_carbonation: false
            })
        );
    }

    #[test]
    fn carbonation_flag_without_range_is_rejected() {
        let model = CalibrationModel {
            carbonation_max: None,
            ..carbonation_model()
        };
        assert_eq!(
            model.validate(),
            Err(ModelError::CarbonationRangeMismatch {
                use_carbonation: true
            })
        );
    }

    #[test]
    fn non_finite_and_inverted_values_are_rejected() {
        let model = CalibrationModel {
            a2: f64::INFINITY,
            ..carbonation_model()
        };
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidValue { field: "a2", .. })
        ));

        let model = CalibrationModel {
            a0: 0.0,
            ..carbonation_model()
        };
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidValue { field: "a0", .. })
        ));

        let model = CalibrationModel {
            carbonation_min: Some(20.0),
            ..carbonation_model()
        };
        assert_eq!(
            model.validate(),
            Err(ModelError::InvertedRange {
                field: MeasurementField::CarbonationDepth,
                min: 20.0,
                max: 15.0,
            })
        );
    }

    #[test]
    fn deserialized_record_missing_exponent_fails_validation() {
        let mut value = serde_json::to_value(carbonation_model()).unwrap();
        let record = value.as_object_mut().unwrap();
        record.remove("a3");
        record.remove("carbonation_min");
        record.remove("carbonation_max");
        let model: CalibrationModel = serde_json::from_value(value).unwrap();
        assert!(model.validate().is_err());
    }

    #[test]
    fn default_law_gives_plausible_strength() {
        // RH 30, UPV 4000 m/s is ordinary structural concrete.
        let fc = DEFAULT_POWER_LAW.evaluate(4000.0, 30.0, None);
        assert!(fc > 20.0 && fc < 30.0, "fc = {fc}");
        assert!(!DEFAULT_POWER_LAW.uses_carbonation());
    }

    #[test]
    fn carbonation_factor_applies_only_with_exponent_and_depth() {
        let law = PowerLaw {
            a0: 2.0,
            a1: 1.0,
            a2: 1.0,
            a3: Some(-1.0),
        };
        assert_eq!(law.evaluate(3.0, 5.0, Some(10.0)), 2.0 * 5.0 * 3.0 / 10.0);
        assert_eq!(law.evaluate(3.0, 5.0, None), 30.0);

        let base = PowerLaw { a3: None, ..law };
        assert_eq!(base.evaluate(3.0, 5.0, Some(10.0)), 30.0);
    }

    #[test]
    fn value_range_of_sample() {
        let range = ValueRange::of([4100.0, 3900.0, 4400.0]).unwrap();
        assert_eq!(range.min, 3900.0);
        assert_eq!(range.max, 4400.0);
        assert!(ValueRange::of(std::iter::empty()).is_none());
    }

    #[test]
    fn value_range_boundaries_are_inclusive() {
        let range = ValueRange { min: 30.0, max: 34.0 };
        assert_eq!(range.position(30.0), RangePosition::Within);
        assert_eq!(range.position(34.0), RangePosition::Within);
        assert_eq!(range.position(29.9), RangePosition::Below);
        assert_eq!(range.position(34.1), RangePosition::Above);
        assert_eq!(
            range.check(20.0, RangeWarning::RhLow, RangeWarning::RhHigh),
            Some(RangeWarning::RhLow)
        );
        assert_eq!(
            range.check(32.0, RangeWarning::RhLow, RangeWarning::RhHigh),
            None
        );
    }
}
