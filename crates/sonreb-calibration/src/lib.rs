//! # sonreb-calibration: Fitting, Prediction, and Diagnostics
//!
//! The computational core of the SonReb engine. Everything here is a pure
//! function of its inputs: no I/O, no clock other than `created_at` stamps,
//! no shared state.
//!
//! - **Fitter** (`fitter.rs`): log-linear least squares over core-verified
//!   points, producing a [`CalibrationModel`] with `r2`/`rmse` in MPa and the
//!   observed input ranges.
//!
//! - **Predictor** (`predictor.rs`): scores a [`Reading`](sonreb_core::Reading)
//!   with a project model or the global default, attaching range warnings and
//!   a rating.
//!
//! - **Diagnostics** (`diagnostics.rs`): predicted-vs-measured pairs and a
//!   residual histogram for a model.
//!
//! - **Summary** (`summary.rs`): project and report aggregates.
//!
//! ## Model Form
//!
//! ```text
//! fc = a0 · RH^a1 · UPV^a2 [· CD^a3]
//! ```
//!
//! Fitted in log space; `a0 = exp(intercept)`.

pub mod diagnostics;
pub mod fitter;
pub mod model;
pub mod predictor;
pub mod regression;
pub mod summary;

pub use diagnostics::{evaluate, evaluate_with_bins, DiagnosticPoint, Diagnostics, HistogramBin};
pub use fitter::{fit, min_points, MIN_POINTS_BASE, MIN_POINTS_WITH_CARBONATION};
pub use model::{CalibrationModel, PowerLaw, ValueRange, DEFAULT_POWER_LAW};
pub use predictor::{predict, range_warnings, EstimatedReading, ModelUsed};
pub use summary::{
    project_summary, report_summary, ProjectSummary, ReportSummary, ScoredReading,
    FC_HISTOGRAM_BIN_WIDTH, MAX_FC_HISTOGRAM_BINS,
};
