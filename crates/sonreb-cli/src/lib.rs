//! # sonreb-cli: Command-Line Interface for the SonReb Engine
//!
//! Provides the `sonreb` binary for offline calibration work on files
//! exported from the field.
//!
//! ## Subcommands
//!
//! - `sonreb fit`: fit a project model from core-verified points.
//! - `sonreb predict`: score readings with a model or the default relation.
//! - `sonreb diagnose`: predicted-vs-measured pairs and residual histogram.
//! - `sonreb summary`: project report over scored readings and cores.
//!
//! ```bash
//! sonreb fit cores.yaml --carbonation --out model.json
//! sonreb predict readings.json --model model.json --units psi
//! sonreb diagnose cores.yaml --model model.json --bins 10
//! sonreb summary readings.json --model model.json --cores cores.yaml --design-fc 28
//! ```
//!
//! Output is JSON on stdout, or in the file named by `--out`.

pub mod diagnose;
pub mod fit;
pub mod input;
pub mod predict;
pub mod summary;
pub mod units;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use serde::Serialize;

use sonreb_core::RatingThresholds;

use crate::units::Units;

/// Where and how results are written.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Destination file; stdout when `None`.
    pub out: Option<PathBuf>,
    /// Strength unit for display.
    pub units: Units,
}

impl OutputOptions {
    /// Serialize `result` as pretty JSON in the selected units.
    pub fn emit<T: Serialize>(&self, result: &T) -> Result<()> {
        let mut value = serde_json::to_value(result).context("failed to serialize result")?;
        self.units.convert(&mut value);
        let rendered = serde_json::to_string_pretty(&value)?;

        match &self.out {
            Some(path) => {
                std::fs::write(path, format!("{rendered}\n"))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "result written");
            }
            None => println!("{rendered}"),
        }
        Ok(())
    }
}

/// Absolute rating cut-offs used when no design strength is known.
#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// Minimum strength (MPa) rated GOOD without a design strength.
    #[arg(long)]
    pub good_min_abs: Option<f64>,

    /// Minimum strength (MPa) rated FAIR without a design strength.
    #[arg(long)]
    pub fair_min_abs: Option<f64>,
}

impl ThresholdArgs {
    /// Defaults overridden by any flag given.
    pub fn thresholds(&self) -> Result<RatingThresholds> {
        let mut thresholds = RatingThresholds::default();
        if let Some(good) = self.good_min_abs {
            ensure!(good.is_finite() && good > 0.0, "--good-min-abs must be positive");
            thresholds.good_min_abs = good;
        }
        if let Some(fair) = self.fair_min_abs {
            ensure!(fair.is_finite() && fair > 0.0, "--fair-min-abs must be positive");
            thresholds.fair_min_abs = fair;
        }
        ensure!(
            thresholds.fair_min_abs <= thresholds.good_min_abs,
            "--fair-min-abs ({}) must not exceed --good-min-abs ({})",
            thresholds.fair_min_abs,
            thresholds.good_min_abs
        );
        Ok(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_default_and_override() {
        let defaults = ThresholdArgs::default().thresholds().unwrap();
        assert_eq!(defaults, RatingThresholds::default());

        let custom = ThresholdArgs {
            good_min_abs: Some(30.0),
            fair_min_abs: Some(24.0),
        }
        .thresholds()
        .unwrap();
        assert_eq!(custom.good_min_abs, 30.0);
        assert_eq!(custom.fair_min_abs, 24.0);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let args = ThresholdArgs {
            good_min_abs: Some(15.0),
            fair_min_abs: None,
        };
        assert!(args.thresholds().is_err());
        let negative = ThresholdArgs {
            good_min_abs: Some(-1.0),
            fair_min_abs: None,
        };
        assert!(negative.thresholds().is_err());
    }

    #[test]
    fn emit_writes_file_in_units() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let options = OutputOptions {
            out: Some(path.clone()),
            units: Units::Psi,
        };
        options
            .emit(&serde_json::json!({ "estimated_fc": 1.0 }))
            .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!((written["estimated_fc"].as_f64().unwrap() - units::PSI_PER_MPA).abs() < 1e-9);
    }
}
