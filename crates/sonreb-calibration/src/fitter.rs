//! # Calibration Fitter
//!
//! Fits the SonReb power law to core-verified points by ordinary least
//! squares on the log-linearised relation:
//!
//! ```text
//! ln fc = ln a0 + a1·ln RH + a2·ln UPV [+ a3·ln CD]
//! ```
//!
//! ## Minimum Sample Policy
//!
//! | Model form        | Coefficients | Minimum points |
//! |-------------------|--------------|----------------|
//! | base              | 3            | 5              |
//! | with carbonation  | 4            | 8              |
//!
//! ## Determinism
//!
//! Points are sorted by identifier before fitting, so the same multiset of
//! points always yields the same coefficients regardless of input order.
//! Goodness of fit (`r2`, `rmse`) is reported in MPa, not log space.

use std::cmp::Ordering;

use chrono::Utc;

use sonreb_core::{
    CalibrationPoint, DegenerateReason, FitError, MeasurementField, ModelId, PointId,
};

use crate::model::{CalibrationModel, PowerLaw, ValueRange};
use crate::regression::{fit_centred, goodness_of_fit};

/// Minimum points for the base model (three coefficients).
pub const MIN_POINTS_BASE: usize = 5;

/// Minimum points for the carbonation model (four coefficients).
pub const MIN_POINTS_WITH_CARBONATION: usize = 8;

/// Minimum number of points needed for the requested model form.
pub fn min_points(use_carbonation: bool) -> usize {
    if use_carbonation {
        MIN_POINTS_WITH_CARBONATION
    } else {
        MIN_POINTS_BASE
    }
}

/// Fit a calibration model to `points`.
///
/// All points must share one project. Fails with `InsufficientData` when the
/// sample is below the minimum for the requested form, `InvalidPoint` for
/// negative or non-finite values, `PointMissingCarbonation` when carbonation
/// is requested and absent, and `DegenerateFit` when the log design cannot
/// identify the coefficients.
pub fn fit(points: &[CalibrationPoint], use_carbonation: bool) -> Result<CalibrationModel, FitError> {
    let required = min_points(use_carbonation);
    if points.len() < required {
        return Err(FitError::insufficient(required, points.len()));
    }

    let project_id = points[0].project_id;
    if let Some(stray) = points.iter().find(|p| p.project_id != project_id) {
        return Err(FitError::ProjectMismatch {
            expected: project_id,
            found: stray.project_id,
            point_id: stray.id,
        });
    }

    let mut sorted: Vec<&CalibrationPoint> = points.iter().collect();
    sorted.sort_by(|a, b| canonical_order(a, b));

    let mut depths = Vec::with_capacity(if use_carbonation { sorted.len() } else { 0 });
    for point in &sorted {
        depths.extend(validate_point(point, use_carbonation)?);
    }

    let ln_rh: Vec<f64> = sorted.iter().map(|p| p.rebound_index.ln()).collect();
    let ln_upv: Vec<f64> = sorted.iter().map(|p| p.upv.ln()).collect();
    let ln_fc: Vec<f64> = sorted.iter().map(|p| p.core_fc.ln()).collect();

    let mut columns = vec![
        (MeasurementField::ReboundIndex, ln_rh),
        (MeasurementField::Upv, ln_upv),
    ];
    if use_carbonation {
        let ln_cd: Vec<f64> = depths.iter().map(|d| d.ln()).collect();
        columns.push((MeasurementField::CarbonationDepth, ln_cd));
    }

    for (field, column) in &columns {
        if is_constant(column) {
            return Err(FitError::DegenerateFit(DegenerateReason::ZeroVariance {
                field: *field,
            }));
        }
    }

    let design: Vec<Vec<f64>> = columns.into_iter().map(|(_, c)| c).collect();
    let solution = fit_centred(&design, &ln_fc).map_err(FitError::DegenerateFit)?;

    let law = PowerLaw {
        a0: solution.intercept.exp(),
        a1: solution.slopes[0],
        a2: solution.slopes[1],
        a3: solution.slopes.get(2).copied(),
    };
    if !law.a0.is_finite() || law.a0 <= 0.0 {
        return Err(FitError::DegenerateFit(
            DegenerateReason::NonFiniteCoefficients,
        ));
    }

    let measured: Vec<f64> = sorted.iter().map(|p| p.core_fc).collect();
    let predicted: Vec<f64> = sorted
        .iter()
        .map(|p| law.evaluate(p.upv, p.rebound_index, p.carbonation_depth))
        .collect();
    let (r2, rmse) = goodness_of_fit(&predicted, &measured);

    let sample_range = |values: Vec<f64>| {
        ValueRange::of(values).ok_or_else(|| FitError::insufficient(required, 0))
    };
    let upv = sample_range(sorted.iter().map(|p| p.upv).collect())?;
    let rh = sample_range(sorted.iter().map(|p| p.rebound_index).collect())?;
    let carbonation = if use_carbonation {
        Some(sample_range(depths)?)
    } else {
        None
    };

    let model = CalibrationModel {
        id: ModelId::new(),
        project_id,
        a0: law.a0,
        a1: law.a1,
        a2: law.a2,
        a3: law.a3,
        r2,
        rmse,
        points_used: sorted.len(),
        use_carbonation,
        upv_min: upv.min,
        upv_max: upv.max,
        rh_min: rh.min,
        rh_max: rh.max,
        carbonation_min: carbonation.map(|r| r.min),
        carbonation_max: carbonation.map(|r| r.max),
        created_at: Utc::now(),
    };
    model.validate().map_err(|err| {
        tracing::debug!(%err, "fitted model failed validation");
        FitError::DegenerateFit(DegenerateReason::NonFiniteCoefficients)
    })?;

    tracing::debug!(
        project_id = %model.project_id,
        model_id = %model.id,
        points_used = model.points_used,
        use_carbonation,
        r2 = model.r2,
        rmse = model.rmse,
        "calibration model fitted"
    );

    Ok(model)
}

/// Sort key: identifier, then measured values under total order.
fn canonical_order(a: &CalibrationPoint, b: &CalibrationPoint) -> Ordering {
    a.id.cmp(&b.id)
        .then_with(|| a.upv.total_cmp(&b.upv))
        .then_with(|| a.rebound_index.total_cmp(&b.rebound_index))
        .then_with(|| {
            a.carbonation_depth
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.carbonation_depth.unwrap_or(f64::NEG_INFINITY))
        })
        .then_with(|| a.core_fc.total_cmp(&b.core_fc))
}

/// Returns the validated carbonation depth when the carbonation term is used.
fn validate_point(point: &CalibrationPoint, use_carbonation: bool) -> Result<Option<f64>, FitError> {
    check_regressor(point.id, MeasurementField::Upv, point.upv)?;
    check_regressor(point.id, MeasurementField::ReboundIndex, point.rebound_index)?;

    if !point.core_fc.is_finite() || point.core_fc <= 0.0 {
        return Err(FitError::InvalidPoint {
            point_id: point.id,
            field: MeasurementField::CoreFc,
            value: point.core_fc,
        });
    }

    if !use_carbonation {
        return Ok(None);
    }
    let depth = point
        .carbonation_depth
        .ok_or(FitError::PointMissingCarbonation { point_id: point.id })?;
    check_regressor(point.id, MeasurementField::CarbonationDepth, depth)?;
    Ok(Some(depth))
}

/// Negative or non-finite is invalid input; exactly zero has no logarithm.
fn check_regressor(point_id: PointId, field: MeasurementField, value: f64) -> Result<(), FitError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FitError::InvalidPoint {
            point_id,
            field,
            value,
        });
    }
    if value == 0.0 {
        return Err(FitError::DegenerateFit(DegenerateReason::ZeroValue {
            point_id,
            field,
        }));
    }
    Ok(())
}

fn is_constant(column: &[f64]) -> bool {
    match column.first() {
        Some(first) => column.iter().all(|v| v == first),
        None => true,
    }
}
