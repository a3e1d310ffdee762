//! # sonreb CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sonreb_cli::diagnose::{run_diagnose, DiagnoseArgs};
use sonreb_cli::fit::{run_fit, FitArgs};
use sonreb_cli::predict::{run_predict, PredictArgs};
use sonreb_cli::summary::{run_summary, SummaryArgs};
use sonreb_cli::units::Units;
use sonreb_cli::OutputOptions;

/// SonReb calibration toolkit.
///
/// Fits project-specific SonReb models from core-verified points, scores
/// field readings, and reports on calibration quality.
#[derive(Parser, Debug)]
#[command(name = "sonreb", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write the result to this file instead of stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Strength unit for output.
    #[arg(long, value_enum, default_value_t = Units::Mpa, global = true)]
    units: Units,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a calibration model from core-verified points.
    Fit(FitArgs),

    /// Score field readings.
    Predict(PredictArgs),

    /// Evaluate a model against cores.
    Diagnose(DiagnoseArgs),

    /// Report on scored readings and cores.
    Summary(SummaryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = OutputOptions {
        out: cli.out,
        units: cli.units,
    };

    let result = match cli.command {
        Commands::Fit(args) => run_fit(&args, &output),
        Commands::Predict(args) => run_predict(&args, &output),
        Commands::Diagnose(args) => run_diagnose(&args, &output),
        Commands::Summary(args) => run_summary(&args, &output),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
