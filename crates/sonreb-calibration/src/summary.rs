//! # Project Summaries
//!
//! Aggregates over a project's scored readings:
//!
//! - [`project_summary`]: counts, strength extremes and mean, rating tally.
//! - [`report_summary`]: the above plus range-warning breakdown, pass/fail
//!   against the design strength, core verification rows, and a strength
//!   histogram in fixed 2 MPa bins.
//!
//! Non-finite strengths are excluded from statistics but still counted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sonreb_core::{CalibrationPoint, PointId, RangeWarning, Rating, Reading};

use crate::diagnostics::HistogramBin;
use crate::model::CalibrationModel;
use crate::predictor::{range_warnings, EstimatedReading};

/// Width of a strength histogram bin, MPa.
pub const FC_HISTOGRAM_BIN_WIDTH: f64 = 2.0;

/// Upper bound on strength histogram bins.
pub const MAX_FC_HISTOGRAM_BINS: usize = 200;

/// A reading together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReading {
    /// Field inputs.
    pub reading: Reading,
    /// Predictor output.
    pub estimate: EstimatedReading,
}

/// Headline statistics for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub readings_count: usize,
    pub min_fc: Option<f64>,
    pub max_fc: Option<f64>,
    pub mean_fc: Option<f64>,
    pub good_count: usize,
    pub fair_count: usize,
    pub poor_count: usize,
}

/// Readings at or above, and below, the design strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassFail {
    pub pass: usize,
    pub fail: usize,
    /// Fraction passing, `None` when no reading was compared.
    pub pass_fraction: Option<f64>,
    /// Fraction failing, `None` when no reading was compared.
    pub fail_fraction: Option<f64>,
}

/// One core compared with the model estimate at the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreVerification {
    pub point_id: PointId,
    pub measured_fc: f64,
    /// `None` when no model is active or it cannot evaluate the core.
    pub predicted_fc: Option<f64>,
    /// `(predicted − measured) / measured · 100`.
    pub error_pct: Option<f64>,
}

/// Full report for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(flatten)]
    pub summary: ProjectSummary,
    pub total_cores: usize,
    /// Total warning flags across all readings.
    pub warnings_total: usize,
    /// Count per flag; every flag is present, zero if unseen.
    pub warnings_breakdown: BTreeMap<RangeWarning, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_fc: Option<f64>,
    /// Present only when a positive design strength is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_fail: Option<PassFail>,
    pub core_verification: Vec<CoreVerification>,
    pub fc_histogram: Vec<HistogramBin>,
}

/// Headline statistics over `readings`.
pub fn project_summary(readings: &[ScoredReading]) -> ProjectSummary {
    let strengths = finite_strengths(readings);
    let count = |rating: Rating| {
        readings
            .iter()
            .filter(|r| r.estimate.rating == rating)
            .count()
    };

    ProjectSummary {
        readings_count: readings.len(),
        min_fc: strengths.iter().copied().reduce(f64::min),
        max_fc: strengths.iter().copied().reduce(f64::max),
        mean_fc: (!strengths.is_empty())
            .then(|| strengths.iter().sum::<f64>() / strengths.len() as f64),
        good_count: count(Rating::Good),
        fair_count: count(Rating::Fair),
        poor_count: count(Rating::Poor),
    }
}

/// Full report over a project's readings and cores.
///
/// Range warnings are recomputed against `model` so that the breakdown
/// reflects the currently active calibration, not the one in force when each
/// reading was scored. Without a model the stored warnings are counted.
pub fn report_summary(
    readings: &[ScoredReading],
    cores: &[CalibrationPoint],
    model: Option<&CalibrationModel>,
    design_fc: Option<f64>,
) -> ReportSummary {
    let summary = project_summary(readings);

    let mut warnings_breakdown: BTreeMap<RangeWarning, usize> =
        RangeWarning::all().iter().map(|w| (*w, 0)).collect();
    for scored in readings {
        let flags = match model {
            Some(model) => range_warnings(&scored.reading, model),
            None => scored.estimate.warnings.clone(),
        };
        for flag in flags {
            *warnings_breakdown.entry(flag).or_insert(0) += 1;
        }
    }
    let warnings_total = warnings_breakdown.values().sum();

    let design_fc = design_fc.filter(|d| d.is_finite() && *d > 0.0);
    let pass_fail = design_fc.map(|design| pass_fail(readings, design));

    let core_verification = cores
        .iter()
        .map(|core| verify_core(core, model))
        .collect();

    ReportSummary {
        summary,
        total_cores: cores.len(),
        warnings_total,
        warnings_breakdown,
        design_fc,
        pass_fail,
        core_verification,
        fc_histogram: fixed_width_histogram(&finite_strengths(readings), FC_HISTOGRAM_BIN_WIDTH),
    }
}

/// Histogram with bins of `width` starting at the sample minimum.
///
/// Bins are `[lo, lo + width)` with the last closed so the maximum is
/// included. A single-valued sample yields one bin. When covering the sample
/// would take more than [`MAX_FC_HISTOGRAM_BINS`] bins, the width grows to
/// `(max - min) / MAX_FC_HISTOGRAM_BINS` instead. Non-finite values are
/// ignored.
pub fn fixed_width_histogram(values: &[f64], width: f64) -> Vec<HistogramBin> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() || !width.is_finite() || width <= 0.0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let span = max - min;
    if !span.is_finite() {
        // Extremes of opposite sign overflow the span; one bin holds all.
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let needed = (span / width).ceil();
    let (width, bin_count) = if needed > MAX_FC_HISTOGRAM_BINS as f64 {
        (span / MAX_FC_HISTOGRAM_BINS as f64, MAX_FC_HISTOGRAM_BINS)
    } else {
        (width, (needed as usize).max(1))
    };

    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for &v in &values {
        let index = ((v - min) / width).floor() as usize;
        bins[index.min(bin_count - 1)].count += 1;
    }
    bins
}

fn finite_strengths(readings: &[ScoredReading]) -> Vec<f64> {
    readings
        .iter()
        .map(|r| r.estimate.estimated_fc)
        .filter(|fc| fc.is_finite())
        .collect()
}

fn pass_fail(readings: &[ScoredReading], design_fc: f64) -> PassFail {
    let strengths = finite_strengths(readings);
    let pass = strengths.iter().filter(|fc| **fc >= design_fc).count();
    let fail = strengths.len() - pass;
    let total = strengths.len();
    let fraction = |n: usize| (total > 0).then(|| n as f64 / total as f64);
    PassFail {
        pass,
        fail,
        pass_fraction: fraction(pass),
        fail_fraction: fraction(fail),
    }
}

fn verify_core(core: &CalibrationPoint, model: Option<&CalibrationModel>) -> CoreVerification {
    let predicted_fc = model
        .filter(|m| !m.use_carbonation || core.carbonation_depth.is_some())
        .map(|m| m.predict_fc(core.upv, core.rebound_index, core.carbonation_depth))
        .filter(|fc| fc.is_finite());
    let error_pct = predicted_fc
        .filter(|_| core.core_fc != 0.0)
        .map(|pred| (pred - core.core_fc) / core.core_fc * 100.0);
    CoreVerification {
        point_id: core.id,
        measured_fc: core.core_fc,
        predicted_fc,
        error_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::predict;
    use chrono::Utc;
    use sonreb_core::{ModelId, ProjectId, RatingThresholds};

    fn scored(fc: f64, rating: Rating) -> ScoredReading {
        let reading = Reading::new(4000.0, 30.0);
        let mut estimate = predict(&reading, None, &RatingThresholds::default()).unwrap();
        estimate.estimated_fc = fc;
        estimate.rating = rating;
        ScoredReading { reading, estimate }
    }

    fn model(project_id: ProjectId) -> CalibrationModel {
        CalibrationModel {
            id: ModelId::new(),
            project_id,
            a0: 1.0e-9,
            a1: 1.2,
            a2: 2.2,
            a3: None,
            r2: 0.9,
            rmse: 1.0,
            points_used: 5,
            use_carbonation: false,
            upv_min: 3800.0,
            upv_max: 4400.0,
            rh_min: 28.0,
            rh_max: 38.0,
            carbonation_min: None,
            carbonation_max: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_and_statistics() {
        let readings = vec![
            scored(30.0, Rating::Good),
            scored(20.0, Rating::Fair),
            scored(10.0, Rating::Poor),
            scored(24.0, Rating::Good),
        ];
        let summary = project_summary(&readings);
        assert_eq!(summary.readings_count, 4);
        assert_eq!(summary.min_fc, Some(10.0));
        assert_eq!(summary.max_fc, Some(30.0));
        assert_eq!(summary.mean_fc, Some(21.0));
        assert_eq!((summary.good_count, summary.fair_count, summary.poor_count), (2, 1, 1));
    }

    #[test]
    fn empty_summary_has_no_statistics() {
        let summary = project_summary(&[]);
        assert_eq!(summary.readings_count, 0);
        assert_eq!(summary.min_fc, None);
        assert_eq!(summary.mean_fc, None);
    }

    #[test]
    fn histogram_uses_fixed_width_from_minimum() {
        let bins = fixed_width_histogram(&[20.0, 21.0, 22.0, 25.0], 2.0);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].lower, 20.0);
        assert_eq!(bins[2].upper, 26.0);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![2, 1, 1]);

        // Maximum on an edge lands in the last bin.
        let bins = fixed_width_histogram(&[20.0, 24.0], 2.0);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[1].count, 1);

        let bins = fixed_width_histogram(&[18.0], 2.0);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 1);

        assert!(fixed_width_histogram(&[], 2.0).is_empty());
    }

    #[test]
    fn histogram_bin_count_is_bounded_for_wide_samples() {
        let bins = fixed_width_histogram(&[25.1, 2.7e15], FC_HISTOGRAM_BIN_WIDTH);
        assert_eq!(bins.len(), MAX_FC_HISTOGRAM_BINS);
        assert_eq!(bins[0].lower, 25.1);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[MAX_FC_HISTOGRAM_BINS - 1].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        let top = bins[MAX_FC_HISTOGRAM_BINS - 1].upper;
        assert!((top - 2.7e15).abs() / 2.7e15 < 1e-9, "top edge {top}");

        // A span that overflows collapses to a single bin.
        let bins = fixed_width_histogram(&[-f64::MAX, f64::MAX], FC_HISTOGRAM_BIN_WIDTH);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);

        // Non-finite values never reach the bins.
        let bins = fixed_width_histogram(&[20.0, f64::INFINITY, f64::NAN], FC_HISTOGRAM_BIN_WIDTH);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 1);
    }

    #[test]
    fn report_survives_an_extreme_estimate() {
        let extreme = {
            let reading = Reading::new(1.0e9, 30.0);
            let estimate = predict(&reading, None, &RatingThresholds::default()).unwrap();
            assert!(estimate.estimated_fc > 1.0e12);
            ScoredReading { reading, estimate }
        };
        let readings = vec![scored(25.1, Rating::Good), extreme];

        let report = report_summary(&readings, &[], None, None);
        assert_eq!(report.summary.readings_count, 2);
        assert!(report.fc_histogram.len() <= MAX_FC_HISTOGRAM_BINS);
        assert_eq!(report.fc_histogram.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn report_pass_fail_against_design() {
        let readings = vec![
            scored(30.0, Rating::Good),
            scored(28.0, Rating::Good),
            scored(20.0, Rating::Poor),
            scored(27.9, Rating::Good),
        ];
        let report = report_summary(&readings, &[], None, Some(28.0));
        let pass_fail = report.pass_fail.unwrap();
        assert_eq!((pass_fail.pass, pass_fail.fail), (2, 2));
        assert_eq!(pass_fail.pass_fraction, Some(0.5));

        let report = report_summary(&readings, &[], None, Some(0.0));
        assert!(report.pass_fail.is_none());
        assert!(report.design_fc.is_none());
    }

    #[test]
    fn report_recomputes_warnings_against_active_model() {
        let project = ProjectId::new();
        let active = model(project);
        let mut low = scored(25.0, Rating::Good);
        low.reading = Reading::new(4000.0, 20.0);
        let mut high = scored(25.0, Rating::Good);
        high.reading = Reading::new(5000.0, 40.0);
        let inside = scored(25.0, Rating::Good);

        let report = report_summary(&[low, high, inside], &[], Some(&active), None);
        assert_eq!(report.warnings_total, 3);
        assert_eq!(report.warnings_breakdown[&RangeWarning::RhLow], 1);
        assert_eq!(report.warnings_breakdown[&RangeWarning::RhHigh], 1);
        assert_eq!(report.warnings_breakdown[&RangeWarning::UpvHigh], 1);
        assert_eq!(report.warnings_breakdown[&RangeWarning::CarbonationLow], 0);
        assert_eq!(report.warnings_breakdown.len(), RangeWarning::all().len());
    }

    #[test]
    fn core_verification_error_percent() {
        let project = ProjectId::new();
        let active = model(project);
        let predicted = active.predict_fc(4000.0, 30.0, None);
        let core = CalibrationPoint::new(project, 4000.0, 30.0, predicted / 1.1);

        let report = report_summary(&[], std::slice::from_ref(&core), Some(&active), None);
        assert_eq!(report.total_cores, 1);
        let row = report.core_verification[0];
        assert_eq!(row.point_id, core.id);
        assert!((row.error_pct.unwrap() - 10.0).abs() < 1e-9);

        let report = report_summary(&[], &[core], None, None);
        assert_eq!(report.core_verification[0].predicted_fc, None);
        assert_eq!(report.core_verification[0].error_pct, None);
    }
}
