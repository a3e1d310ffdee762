//! # Fit Subcommand
//!
//! Fits a calibration model from a cores file and writes it as JSON. The
//! output can be fed back to `predict`, `diagnose`, and `summary` through
//! `--model`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use sonreb_calibration::{fit, min_points};
use sonreb_core::ProjectId;

use crate::input::load_cores;
use crate::OutputOptions;

/// Arguments for the `sonreb fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Cores file (JSON or YAML).
    #[arg(value_name = "CORES")]
    pub cores: PathBuf,

    /// Include carbonation depth as a regressor.
    #[arg(long)]
    pub carbonation: bool,

    /// Project identifier when the file does not carry one.
    #[arg(long)]
    pub project: Option<Uuid>,
}

/// Execute the fit subcommand.
pub fn run_fit(args: &FitArgs, output: &OutputOptions) -> Result<u8> {
    let points = load_cores(&args.cores, args.project.map(ProjectId::from_uuid))?;
    tracing::info!(
        points = points.len(),
        required = min_points(args.carbonation),
        carbonation = args.carbonation,
        "fitting calibration model"
    );

    let model = fit(&points, args.carbonation)
        .with_context(|| format!("cannot fit a model from {}", args.cores.display()))?;

    tracing::info!(model_id = %model.id, r2 = model.r2, rmse = model.rmse, "model fitted");
    output.emit(&model)?;
    Ok(0)
}
