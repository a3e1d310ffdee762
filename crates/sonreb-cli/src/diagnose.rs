//! # Diagnose Subcommand
//!
//! Evaluates a fitted model against a cores file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use sonreb_calibration::diagnostics::DEFAULT_BIN_COUNT;
use sonreb_calibration::evaluate_with_bins;

use crate::input::{load_cores, load_model};
use crate::OutputOptions;

/// Arguments for the `sonreb diagnose` subcommand.
#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Cores file (JSON or YAML). Cores without a project take the model's.
    #[arg(value_name = "CORES")]
    pub cores: PathBuf,

    /// Fitted model to evaluate.
    #[arg(long)]
    pub model: PathBuf,

    /// Residual histogram bins.
    #[arg(long, default_value_t = DEFAULT_BIN_COUNT as u16, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub bins: u16,
}

/// Execute the diagnose subcommand.
pub fn run_diagnose(args: &DiagnoseArgs, output: &OutputOptions) -> Result<u8> {
    let model = load_model(&args.model)?;
    let points = load_cores(&args.cores, Some(model.project_id))?;

    let diagnostics = evaluate_with_bins(&model, &points, usize::from(args.bins));
    tracing::info!(
        evaluated = diagnostics.points.len(),
        skipped = diagnostics.skipped,
        "diagnostics computed"
    );

    output.emit(&diagnostics)?;
    Ok(0)
}
