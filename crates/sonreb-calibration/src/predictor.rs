//! # Strength Predictor
//!
//! Scores a field reading: estimated strength, rating, and range warnings.
//!
//! With no calibrated model the global [`DEFAULT_POWER_LAW`] applies and no
//! range warnings are produced, since that relation has no calibrated range.
//! Out-of-range inputs never fail; they are flagged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sonreb_core::{
    MeasurementField, ModelId, PredictError, RangeWarning, Rating, RatingPolicy,
    RatingThresholds, Reading,
};

use crate::model::{CalibrationModel, DEFAULT_POWER_LAW};

/// Which model produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelUsed {
    /// The global default relation.
    Default,
    /// A project calibration.
    Calibrated,
}

/// The scored outcome of a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedReading {
    /// Estimated compressive strength, MPa.
    pub estimated_fc: f64,
    /// Qualitative rating.
    pub rating: Rating,
    /// Rating rule that was applied.
    pub rating_policy: RatingPolicy,
    /// Default relation or project calibration.
    pub model_used: ModelUsed,
    /// Calibration that produced the estimate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<ModelId>,
    /// Out-of-calibrated-range flags, possibly empty.
    #[serde(default)]
    pub warnings: BTreeSet<RangeWarning>,
}

/// Score `reading` against `model`, or against the default relation when
/// `model` is `None`.
pub fn predict(
    reading: &Reading,
    model: Option<&CalibrationModel>,
    thresholds: &RatingThresholds,
) -> Result<EstimatedReading, PredictError> {
    validate_reading(reading, model)?;

    let (estimated_fc, model_used, model_id, warnings) = match model {
        Some(model) => (
            model.predict_fc(reading.upv, reading.rebound_index, reading.carbonation_depth),
            ModelUsed::Calibrated,
            Some(model.id),
            range_warnings(reading, model),
        ),
        None => (
            DEFAULT_POWER_LAW.evaluate(reading.upv, reading.rebound_index, None),
            ModelUsed::Default,
            None,
            BTreeSet::new(),
        ),
    };

    let rating_policy = RatingPolicy::select(reading.design_fc);
    let rating = rating_policy.classify(estimated_fc, thresholds);

    tracing::debug!(
        estimated_fc,
        %rating,
        model_used = ?model_used,
        warnings = warnings.len(),
        "reading scored"
    );

    Ok(EstimatedReading {
        estimated_fc,
        rating,
        rating_policy,
        model_used,
        model_id,
        warnings,
    })
}

/// Flags for every input outside the model's calibrated ranges.
///
/// Carbonation is only checked when the model uses it and the reading
/// carries a depth.
pub fn range_warnings(reading: &Reading, model: &CalibrationModel) -> BTreeSet<RangeWarning> {
    let mut warnings = BTreeSet::new();
    warnings.extend(model.rh_range().check(
        reading.rebound_index,
        RangeWarning::RhLow,
        RangeWarning::RhHigh,
    ));
    warnings.extend(
        model
            .upv_range()
            .check(reading.upv, RangeWarning::UpvLow, RangeWarning::UpvHigh),
    );
    if let (Some(range), Some(depth)) = (model.carbonation_range(), reading.carbonation_depth) {
        warnings.extend(range.check(
            depth,
            RangeWarning::CarbonationLow,
            RangeWarning::CarbonationHigh,
        ));
    }
    warnings
}

fn validate_reading(reading: &Reading, model: Option<&CalibrationModel>) -> Result<(), PredictError> {
    require_positive(MeasurementField::Upv, reading.upv)?;
    require_positive(MeasurementField::ReboundIndex, reading.rebound_index)?;

    let needs_carbonation = model.is_some_and(|m| m.use_carbonation);
    match reading.carbonation_depth {
        None if needs_carbonation => Err(PredictError::MissingCarbonation),
        None => Ok(()),
        // A zero depth has no logarithm under the carbonation term.
        Some(depth) if needs_carbonation => require_positive(MeasurementField::CarbonationDepth, depth),
        Some(depth) if !depth.is_finite() || depth < 0.0 => Err(PredictError::InvalidReading {
            field: MeasurementField::CarbonationDepth,
            value: depth,
        }),
        Some(_) => Ok(()),
    }
}

fn require_positive(field: MeasurementField, value: f64) -> Result<(), PredictError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PredictError::InvalidReading { field, value })
    }
}
