//! # Predict Subcommand
//!
//! Scores every reading in a file. Readings the predictor rejects are
//! reported in place with their error kind; the exit code is 1 when any
//! reading was rejected.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use sonreb_calibration::{predict, CalibrationModel, EstimatedReading, ScoredReading};
use sonreb_core::{PredictError, RatingThresholds, Reading};

use crate::input::{load_model, load_readings};
use crate::{OutputOptions, ThresholdArgs};

/// Arguments for the `sonreb predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Readings file (JSON or YAML).
    #[arg(value_name = "READINGS")]
    pub readings: PathBuf,

    /// Fitted model; the default relation is used when omitted.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Design strength (MPa) for readings that do not carry one.
    #[arg(long)]
    pub design_fc: Option<f64>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

/// One scored or rejected reading.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    /// Position in the input file.
    pub index: usize,
    pub reading: Reading,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<EstimatedReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PredictError>,
}

impl PredictionRow {
    fn scored(&self) -> Option<ScoredReading> {
        self.estimate.clone().map(|estimate| ScoredReading {
            reading: self.reading,
            estimate,
        })
    }
}

/// Score `readings`, keeping rejected ones as error rows.
pub fn score_readings(
    readings: &[Reading],
    model: Option<&CalibrationModel>,
    thresholds: &RatingThresholds,
) -> Vec<PredictionRow> {
    readings
        .iter()
        .enumerate()
        .map(|(index, reading)| match predict(reading, model, thresholds) {
            Ok(estimate) => {
                if !estimate.warnings.is_empty() {
                    tracing::warn!(index, warnings = ?estimate.warnings, "reading outside calibrated range");
                }
                PredictionRow {
                    index,
                    reading: *reading,
                    estimate: Some(estimate),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "reading rejected");
                PredictionRow {
                    index,
                    reading: *reading,
                    estimate: None,
                    error: Some(err),
                }
            }
        })
        .collect()
}

/// Successful rows as scored readings.
pub fn scored(rows: &[PredictionRow]) -> Vec<ScoredReading> {
    rows.iter().filter_map(PredictionRow::scored).collect()
}

/// Execute the predict subcommand.
pub fn run_predict(args: &PredictArgs, output: &OutputOptions) -> Result<u8> {
    let thresholds = args.thresholds.thresholds()?;
    let model = args.model.as_deref().map(load_model).transpose()?;
    let readings = load_readings(&args.readings, args.design_fc)?;

    let rows = score_readings(&readings, model.as_ref(), &thresholds);
    let rejected = rows.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(scored = rows.len() - rejected, rejected, "readings scored");

    output.emit(&rows)?;
    Ok(if rejected > 0 { 1 } else { 0 })
}
