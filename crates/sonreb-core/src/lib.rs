//! # sonreb-core: Foundational Types for the SonReb Engine
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace: identifiers, calibration points, field readings, range-warning
//! flags, rating policy, and the structured error kinds. It depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `ProjectId`, `MemberId`, `PointId`, `ModelId`,
//!    `ReadingId` are distinct types. A point id cannot be passed where a
//!    model id is expected.
//!
//! 2. **Fixed boundary units.** Strength is MPa, velocity is m/s, depth is mm.
//!    Nothing in this crate converts units; display conversion belongs to the
//!    presentation layer.
//!
//! 3. **Single `RangeWarning` enum.** Every out-of-range flag the predictor can
//!    raise is one variant, serialized as the snake_case tag the report layer
//!    counts (`rh_low`, `upv_high`, ...).
//!
//! 4. **Rating policy is data, not dispatch.** [`RatingPolicy::select`] picks
//!    design-ratio or absolute-threshold classification from the inputs; one
//!    function then classifies.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sonreb-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - No ambient state: thresholds and models are always passed explicitly.

pub mod error;
pub mod identity;
pub mod measurement;
pub mod rating;
pub mod warning;

// Re-export primary types for ergonomic imports.
pub use error::{DegenerateReason, FitError, ModelError, PredictError, SonrebError};
pub use identity::{MemberId, ModelId, PointId, ProjectId, ReadingId};
pub use measurement::{CalibrationPoint, MeasurementField, Reading};
pub use rating::{classify_rating, Rating, RatingPolicy, RatingThresholds};
pub use warning::{RangeWarning, RANGE_WARNING_COUNT};
