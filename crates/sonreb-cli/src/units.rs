//! # Display Units
//!
//! The engine works in MPa. `--units psi` converts strength-valued fields of
//! the JSON output just before it is written; nothing upstream sees psi.

use clap::ValueEnum;
use serde_json::Value;

/// psi per MPa.
pub const PSI_PER_MPA: f64 = 145.0377377;

/// Fields holding a strength in MPa.
const STRENGTH_FIELDS: &[&str] = &[
    "core_fc",
    "design_fc",
    "estimated_fc",
    "measured_fc",
    "predicted_fc",
    "min_fc",
    "max_fc",
    "mean_fc",
    "rmse",
    "good_min_abs",
    "fair_min_abs",
];

/// Histograms whose bin edges are strengths.
const STRENGTH_HISTOGRAMS: &[&str] = &["residual_bins", "fc_histogram"];

/// Strength unit used for output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Units {
    /// Megapascal.
    #[default]
    Mpa,
    /// Pounds per square inch.
    Psi,
}

impl Units {
    /// Convert a strength from MPa.
    pub fn from_mpa(self, mpa: f64) -> f64 {
        match self {
            Self::Mpa => mpa,
            Self::Psi => mpa * PSI_PER_MPA,
        }
    }

    /// Rewrite every strength-valued field of `value` in place.
    pub fn convert(self, value: &mut Value) {
        if self != Self::Mpa {
            convert_value(value, self);
        }
    }
}

fn convert_value(value: &mut Value, units: Units) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if STRENGTH_FIELDS.contains(&key.as_str()) {
                    scale_number(field, units);
                } else if STRENGTH_HISTOGRAMS.contains(&key.as_str()) {
                    if let Value::Array(bins) = field {
                        for bin in bins.iter_mut().filter_map(Value::as_object_mut) {
                            for edge in ["lower", "upper"] {
                                if let Some(v) = bin.get_mut(edge) {
                                    scale_number(v, units);
                                }
                            }
                        }
                    }
                } else {
                    convert_value(field, units);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                convert_value(item, units);
            }
        }
        _ => {}
    }
}

fn scale_number(value: &mut Value, units: Units) {
    if let Some(mpa) = value.as_f64() {
        if let Some(converted) = serde_json::Number::from_f64(units.from_mpa(mpa)) {
            *value = Value::Number(converted);
        }
    }
}
