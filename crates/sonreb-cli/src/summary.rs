//! # Summary Subcommand
//!
//! Scores a readings file and reports on it: headline statistics, range
//! warnings against the model, pass/fail against the design strength, core
//! verification, and a strength histogram.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use sonreb_calibration::report_summary;

use crate::input::{load_cores, load_model, load_readings};
use crate::predict::{score_readings, scored};
use crate::{OutputOptions, ThresholdArgs};

/// Arguments for the `sonreb summary` subcommand.
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Readings file (JSON or YAML).
    #[arg(value_name = "READINGS")]
    pub readings: PathBuf,

    /// Fitted model; the default relation is used when omitted.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Cores to verify against the model.
    #[arg(long)]
    pub cores: Option<PathBuf>,

    /// Project design strength, MPa.
    #[arg(long)]
    pub design_fc: Option<f64>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

/// Execute the summary subcommand.
pub fn run_summary(args: &SummaryArgs, output: &OutputOptions) -> Result<u8> {
    let thresholds = args.thresholds.thresholds()?;
    let model = args.model.as_deref().map(load_model).transpose()?;
    let readings = load_readings(&args.readings, args.design_fc)?;
    let cores = match &args.cores {
        Some(path) => load_cores(path, model.as_ref().map(|m| m.project_id))?,
        None => Vec::new(),
    };

    let rows = score_readings(&readings, model.as_ref(), &thresholds);
    let scored = scored(&rows);
    if scored.len() < rows.len() {
        tracing::warn!(
            rejected = rows.len() - scored.len(),
            "rejected readings left out of the summary"
        );
    }

    let report = report_summary(&scored, &cores, model.as_ref(), args.design_fc);
    output.emit(&report)?;
    Ok(0)
}
