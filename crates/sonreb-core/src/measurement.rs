//! # Measurements
//!
//! The two input records of the engine:
//!
//! - [`CalibrationPoint`]: a core-verified tuple (UPV, RH, optional CD, core fc)
//!   used as ground truth when fitting a model.
//! - [`Reading`]: a field measurement to be scored against a model.
//!
//! Units are fixed at this boundary: `upv` in m/s, `carbonation_depth` in mm,
//! strengths in MPa. The records carry values as captured; validation happens
//! in the operation that consumes them so that each operation reports its own
//! error kind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{MemberId, PointId, ProjectId};

/// One core-verified calibration measurement.
///
/// Immutable once created; a corrective edit replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Opaque point identifier.
    #[serde(default)]
    pub id: PointId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Structural member the core was drilled from, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<MemberId>,
    /// Ultrasonic pulse velocity, m/s.
    pub upv: f64,
    /// Rebound hammer index.
    #[serde(alias = "rh_index")]
    pub rebound_index: f64,
    /// Carbonation depth, mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbonation_depth: Option<f64>,
    /// Lab-measured core compressive strength, MPa.
    pub core_fc: f64,
    /// Free-text field notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    /// Capture time (UTC).
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CalibrationPoint {
    /// Create a point without carbonation depth or member reference.
    pub fn new(project_id: ProjectId, upv: f64, rebound_index: f64, core_fc: f64) -> Self {
        Self {
            id: PointId::new(),
            project_id,
            member_id: None,
            upv,
            rebound_index,
            carbonation_depth: None,
            core_fc,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a carbonation depth (mm).
    pub fn with_carbonation(mut self, depth_mm: f64) -> Self {
        self.carbonation_depth = Some(depth_mm);
        self
    }

    /// Attach the structural member the core came from.
    pub fn with_member(mut self, member_id: MemberId) -> Self {
        self.member_id = Some(member_id);
        self
    }

    /// Replace the generated identifier.
    pub fn with_id(mut self, id: PointId) -> Self {
        self.id = id;
        self
    }
}

/// A field reading to be scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Ultrasonic pulse velocity, m/s.
    pub upv: f64,
    /// Rebound hammer index.
    #[serde(alias = "rh_index")]
    pub rebound_index: f64,
    /// Carbonation depth, mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbonation_depth: Option<f64>,
    /// Design strength of the owning project, MPa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_fc: Option<f64>,
}

impl Reading {
    /// Create a reading from the two mandatory inputs.
    pub fn new(upv: f64, rebound_index: f64) -> Self {
        Self {
            upv,
            rebound_index,
            carbonation_depth: None,
            design_fc: None,
        }
    }

    /// Attach a carbonation depth (mm).
    pub fn with_carbonation(mut self, depth_mm: f64) -> Self {
        self.carbonation_depth = Some(depth_mm);
        self
    }

    /// Attach the project's design strength (MPa).
    pub fn with_design_fc(mut self, design_fc: f64) -> Self {
        self.design_fc = Some(design_fc);
        self
    }
}

/// Names a measured quantity in error reports and validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementField {
    /// Ultrasonic pulse velocity.
    Upv,
    /// Rebound hammer index.
    ReboundIndex,
    /// Carbonation depth.
    CarbonationDepth,
    /// Core compressive strength.
    CoreFc,
    /// Project design strength.
    DesignFc,
}

impl MeasurementField {
    /// Returns the snake_case identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upv => "upv",
            Self::ReboundIndex => "rebound_index",
            Self::CarbonationDepth => "carbonation_depth",
            Self::CoreFc => "core_fc",
            Self::DesignFc => "design_fc",
        }
    }
}

impl fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
