//! # Calibration Engine Properties
//!
//! End-to-end checks across fitter, predictor, and diagnostics using the
//! public crate API only.

use proptest::prelude::*;

use sonreb_calibration::{
    evaluate, fit, predict, CalibrationModel, ModelUsed, PowerLaw, MIN_POINTS_WITH_CARBONATION,
};
use sonreb_core::{
    CalibrationPoint, FitError, ProjectId, RangeWarning, Rating, RatingThresholds, Reading,
};

const CARBONATION_INPUTS: [(f64, f64, f64); 8] = [
    (3800.0, 28.0, 5.0),
    (4100.0, 31.0, 12.0),
    (3950.0, 35.0, 8.0),
    (4300.0, 30.0, 3.0),
    (4500.0, 38.0, 15.0),
    (3700.0, 33.0, 10.0),
    (4050.0, 29.0, 6.0),
    (4200.0, 36.0, 4.0),
];

const CARBONATION_LAW: PowerLaw = PowerLaw {
    a0: 1.0e-9,
    a1: 1.1,
    a2: 2.3,
    a3: Some(-0.15),
};

fn carbonation_points(project: ProjectId) -> Vec<CalibrationPoint> {
    CARBONATION_INPUTS
        .iter()
        .map(|&(upv, rh, cd)| {
            let fc = CARBONATION_LAW.evaluate(upv, rh, Some(cd));
            CalibrationPoint::new(project, upv, rh, fc).with_carbonation(cd)
        })
        .collect()
}

/// Five near-monotonic cores with no carbonation.
fn scenario_points(project: ProjectId) -> Vec<CalibrationPoint> {
    [
        (4000.0, 30.0, 25.0),
        (4100.0, 31.0, 26.0),
        (4200.0, 32.0, 27.5),
        (4300.0, 33.0, 28.0),
        (4400.0, 34.0, 29.0),
    ]
    .iter()
    .map(|&(upv, rh, fc)| CalibrationPoint::new(project, upv, rh, fc))
    .collect()
}

fn relative_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(f64::MIN_POSITIVE)
}

fn same_coefficients(a: &CalibrationModel, b: &CalibrationModel) -> bool {
    relative_eq(a.a0, b.a0)
        && relative_eq(a.a1, b.a1)
        && relative_eq(a.a2, b.a2)
        && match (a.a3, b.a3) {
            (Some(x), Some(y)) => relative_eq(x, y),
            (None, None) => true,
            _ => false,
        }
}

// ---------------------------------------------------------------------------
// Minimum sample policy
// ---------------------------------------------------------------------------

#[test]
fn carbonation_fit_needs_eight_points() {
    let points = carbonation_points(ProjectId::new());
    assert_eq!(points.len(), MIN_POINTS_WITH_CARBONATION);

    let err = fit(&points[..7], true).unwrap_err();
    assert_eq!(
        err,
        FitError::InsufficientData {
            required: 8,
            available: 7,
            needed: 1
        }
    );

    let model = fit(&points, true).unwrap();
    assert!(model.use_carbonation);
    assert_eq!(model.points_used, 8);
    assert!((model.a3.unwrap() + 0.15).abs() < 1e-6);
    assert_eq!(model.carbonation_min, Some(3.0));
    assert_eq!(model.carbonation_max, Some(15.0));
}

#[test]
fn seven_points_suffice_without_carbonation() {
    let points = carbonation_points(ProjectId::new());
    let model = fit(&points[..7], false).unwrap();
    assert!(!model.use_carbonation);
    assert_eq!(model.a3, None);
    assert_eq!(model.carbonation_min, None);
}

// ---------------------------------------------------------------------------
// Determinism and accuracy
// ---------------------------------------------------------------------------

#[test]
fn permuted_input_yields_identical_coefficients() {
    let points = carbonation_points(ProjectId::new());
    let first = fit(&points, true).unwrap();

    let mut reversed = points.clone();
    reversed.reverse();
    let second = fit(&reversed, true).unwrap();

    let mut rotated = points.clone();
    rotated.rotate_left(3);
    let third = fit(&rotated, true).unwrap();

    assert!(same_coefficients(&first, &second));
    assert!(same_coefficients(&first, &third));
    assert_eq!(first.r2, second.r2);
    assert_eq!(first.rmse, third.rmse);
}

#[test]
fn noise_free_power_law_fits_exactly() {
    let model = fit(&carbonation_points(ProjectId::new()), true).unwrap();
    assert!((model.r2 - 1.0).abs() < 1e-6, "r2 = {}", model.r2);
    assert!(model.rmse < 1e-6, "rmse = {}", model.rmse);
}

#[test]
fn near_monotonic_scenario_fits_well() {
    let model = fit(&scenario_points(ProjectId::new()), false).unwrap();
    assert_eq!(model.points_used, 5);
    assert!(!model.use_carbonation);
    assert!(model.r2 > 0.9, "r2 = {}", model.r2);
    assert_eq!((model.rh_min, model.rh_max), (30.0, 34.0));
    assert_eq!((model.upv_min, model.upv_max), (4000.0, 4400.0));
}

// ---------------------------------------------------------------------------
// Prediction scenarios
// ---------------------------------------------------------------------------

#[test]
fn reading_below_calibrated_rebound_range_is_flagged() {
    let model = fit(&scenario_points(ProjectId::new()), false).unwrap();
    let estimate = predict(
        &Reading::new(3000.0, 20.0),
        Some(&model),
        &RatingThresholds::default(),
    )
    .unwrap();
    assert!(estimate.warnings.contains(&RangeWarning::RhLow));
    assert!(estimate.warnings.contains(&RangeWarning::UpvLow));
    assert_eq!(estimate.model_used, ModelUsed::Calibrated);
}

#[test]
fn estimate_close_to_design_rates_good() {
    let model = fit(&scenario_points(ProjectId::new()), false).unwrap();
    let reading = Reading::new(4200.0, 32.0).with_design_fc(28.0);
    let estimate = predict(&reading, Some(&model), &RatingThresholds::default()).unwrap();
    assert!(
        (estimate.estimated_fc - 27.5).abs() < 1.0,
        "fc = {}",
        estimate.estimated_fc
    );
    assert_eq!(estimate.rating, Rating::Good);
    assert!(estimate.warnings.is_empty());
}

#[test]
fn project_without_model_uses_default() {
    let estimate = predict(
        &Reading::new(4000.0, 30.0),
        None,
        &RatingThresholds::default(),
    )
    .unwrap();
    assert_eq!(estimate.model_used, ModelUsed::Default);
    assert!(estimate.warnings.is_empty());
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn diagnostics_reproduce_fit_quality() {
    let points = scenario_points(ProjectId::new());
    let model = fit(&points, false).unwrap();
    let diagnostics = evaluate(&model, &points);

    assert_eq!(diagnostics.points.len(), 5);
    assert_eq!(diagnostics.skipped, 0);
    assert!((diagnostics.r2.unwrap() - model.r2).abs() < 1e-9);
    assert!((diagnostics.rmse.unwrap() - model.rmse).abs() < 1e-9);
    assert_eq!(
        diagnostics
            .residual_bins
            .iter()
            .map(|b| b.count)
            .sum::<usize>(),
        5
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Residual histogram counts sum to the number of evaluated points.
    #[test]
    fn diagnostics_conserve_points(
        noise in proptest::collection::vec(0.8f64..1.2, 5..30),
    ) {
        let project = ProjectId::new();
        let law = PowerLaw { a0: 1.0e-9, a1: 1.1, a2: 2.3, a3: None };
        let points: Vec<CalibrationPoint> = noise
            .iter()
            .enumerate()
            .map(|(i, factor)| {
                let upv = 3600.0 + (i * 37 % 900) as f64;
                let rh = 25.0 + (i * 13 % 17) as f64;
                CalibrationPoint::new(project, upv, rh, law.evaluate(upv, rh, None) * factor)
            })
            .collect();

        if let Ok(model) = fit(&points, false) {
            let diagnostics = evaluate(&model, &points);
            let total: usize = diagnostics.residual_bins.iter().map(|b| b.count).sum();
            prop_assert_eq!(total, points.len());
        }
    }
}
