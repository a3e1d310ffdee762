//! # Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs and helpers that turn JSON
//! rejections into [`AppError::BadRequest`].

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule checks beyond what serde enforces.
pub trait Validate {
    /// Returns a message describing the first violated rule.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Require `value` to be finite and strictly positive.
pub fn require_positive(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{name} must be a positive number, got {value}"))
    }
}

/// Require `value`, when present, to be finite and non-negative.
pub fn require_non_negative(name: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(format!("{name} must be a non-negative number, got {v}"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Depth(Option<f64>);

    impl Validate for Depth {
        fn validate(&self) -> Result<(), String> {
            require_non_negative("carbonation_depth", self.0)
        }
    }

    #[test]
    fn validated_json_runs_business_rules() {
        assert!(extract_validated_json(Ok(Json(Depth(Some(4.0))))).is_ok());
        assert!(extract_validated_json(Ok(Json(Depth(None)))).is_ok());
        let err = extract_validated_json(Ok(Json(Depth(Some(-1.0))))).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("carbonation_depth")));
    }

    #[test]
    fn positivity() {
        assert!(require_positive("upv", 4000.0).is_ok());
        assert!(require_positive("upv", 0.0).is_err());
        assert!(require_positive("upv", f64::NAN).is_err());
        assert!(require_non_negative("cd", Some(0.0)).is_ok());
        assert!(require_non_negative("cd", Some(f64::INFINITY)).is_err());
    }
}
