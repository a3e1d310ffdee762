//! # Model Diagnostics
//!
//! Evaluates a fitted model against calibration points: predicted-vs-measured
//! pairs for a scatter plot, a residual histogram, and recomputed `r2`/`rmse`.
//!
//! Residuals are `predicted − measured`. Histogram bins are equal width and
//! cover `[min, max]` of the residuals; every residual lands in exactly one
//! bin, the maximum going to the last.

use serde::{Deserialize, Serialize};

use sonreb_core::{CalibrationPoint, ModelId, PointId};

use crate::model::CalibrationModel;
use crate::regression::goodness_of_fit;

/// Number of residual bins used when the caller does not choose.
pub const DEFAULT_BIN_COUNT: usize = 8;

/// One predicted-vs-measured pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPoint {
    /// Source calibration point.
    pub point_id: PointId,
    /// Model estimate, MPa.
    pub predicted_fc: f64,
    /// Core strength, MPa.
    pub measured_fc: f64,
}

impl DiagnosticPoint {
    /// `predicted − measured`, MPa.
    pub fn residual(&self) -> f64 {
        self.predicted_fc - self.measured_fc
    }
}

/// One histogram bucket, `[lower, upper)` except the last which is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub lower: f64,
    /// Upper edge.
    pub upper: f64,
    /// Values in the bucket.
    pub count: usize,
}

/// Diagnostics for one model over a set of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Evaluated model.
    pub model_id: ModelId,
    /// Pairs, in input order.
    pub points: Vec<DiagnosticPoint>,
    /// Residual histogram.
    pub residual_bins: Vec<HistogramBin>,
    /// `r2` over the evaluated points; `None` when no point was evaluated.
    pub r2: Option<f64>,
    /// `rmse` over the evaluated points; `None` when no point was evaluated.
    pub rmse: Option<f64>,
    /// Points left out because the model cannot evaluate them.
    pub skipped: usize,
}

/// Evaluate `model` over `points` with [`DEFAULT_BIN_COUNT`] residual bins.
pub fn evaluate(model: &CalibrationModel, points: &[CalibrationPoint]) -> Diagnostics {
    evaluate_with_bins(model, points, DEFAULT_BIN_COUNT)
}

/// Evaluate `model` over `points` with `bin_count` residual bins.
///
/// Points from another project, points missing the carbonation depth a
/// carbonation model needs, and points whose estimate is not finite are
/// skipped and counted.
pub fn evaluate_with_bins(
    model: &CalibrationModel,
    points: &[CalibrationPoint],
    bin_count: usize,
) -> Diagnostics {
    let mut pairs = Vec::with_capacity(points.len());
    let mut skipped = 0usize;

    for point in points {
        if point.project_id != model.project_id
            || (model.use_carbonation && point.carbonation_depth.is_none())
        {
            skipped += 1;
            continue;
        }
        let predicted_fc = model.predict_fc(point.upv, point.rebound_index, point.carbonation_depth);
        if !predicted_fc.is_finite() || !point.core_fc.is_finite() {
            skipped += 1;
            continue;
        }
        pairs.push(DiagnosticPoint {
            point_id: point.id,
            predicted_fc,
            measured_fc: point.core_fc,
        });
    }

    if skipped > 0 {
        tracing::warn!(model_id = %model.id, skipped, "points skipped during diagnostics");
    }

    let residuals: Vec<f64> = pairs.iter().map(DiagnosticPoint::residual).collect();
    let residual_bins = residual_bins(&residuals, bin_count);

    let (r2, rmse) = if pairs.is_empty() {
        (None, None)
    } else {
        let predicted: Vec<f64> = pairs.iter().map(|p| p.predicted_fc).collect();
        let measured: Vec<f64> = pairs.iter().map(|p| p.measured_fc).collect();
        let (r2, rmse) = goodness_of_fit(&predicted, &measured);
        (Some(r2), Some(rmse))
    };

    Diagnostics {
        model_id: model.id,
        points: pairs,
        residual_bins,
        r2,
        rmse,
        skipped,
    }
}

/// Equal-width histogram of `residuals` over their `[min, max]`.
///
/// When every residual is equal the span is 1.0 centred on that value.
/// Empty input or `bin_count == 0` yields no bins.
pub fn residual_bins(residuals: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    if residuals.is_empty() || bin_count == 0 {
        return Vec::new();
    }
    let min = residuals.iter().copied().fold(f64::INFINITY, f64::min);
    let max = residuals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (lower, span) = if max > min {
        (min, max - min)
    } else {
        (min - 0.5, 1.0)
    };
    let width = span / bin_count as f64;

    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: lower + i as f64 * width,
            upper: if i + 1 == bin_count {
                lower + span
            } else {
                lower + (i + 1) as f64 * width
            },
            count: 0,
        })
        .collect();

    for &r in residuals {
        bins[bin_index(r, lower, span, bin_count)].count += 1;
    }
    bins
}

fn bin_index(value: f64, lower: f64, span: f64, bin_count: usize) -> usize {
    let scaled = ((value - lower) / span * bin_count as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(bin_count - 1)
    }
}
