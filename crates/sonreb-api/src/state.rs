//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Projects**: project records holding the design strength.
//! - **Calibration points**: core-verified measurements per project.
//! - **Readings**: scored field readings per project.
//! - **Model registry**: every generated model plus the active pointer per
//!   project, updated together under one write guard.
//!
//! All stores are in memory.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sonreb_calibration::{CalibrationModel, ScoredReading};
use sonreb_core::{
    CalibrationPoint, MemberId, ModelId, PointId, ProjectId, RatingThresholds, ReadingId,
};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and is never held across `.await` points.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Snapshot every record matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Records ------------------------------------------------------------------

/// A project: the unit that owns points, models, and readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Specified compressive strength, MPa. Drives design-ratio rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_fc: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A stored, scored field reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: ReadingId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<MemberId>,
    /// Free-text grid or location label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_tag: Option<String>,
    #[serde(flatten)]
    pub scored: ScoredReading,
    pub created_at: DateTime<Utc>,
}

/// A generated model as listed, with its activation flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelListing {
    #[serde(flatten)]
    pub model: CalibrationModel,
    pub is_active: bool,
}

// -- Model Registry -----------------------------------------------------------

#[derive(Debug, Default)]
struct RegistryInner {
    models: HashMap<ModelId, CalibrationModel>,
    active: HashMap<ProjectId, ModelId>,
}

/// Every generated model plus at most one active model per project.
///
/// Models are immutable once stored. Activation replaces the project's
/// active pointer under the same write guard that reads the model, so
/// concurrent activations serialise and readers never observe a pointer to
/// a model of another project.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly fitted model and make it the project's active model.
    pub fn insert_and_activate(&self, model: CalibrationModel) -> CalibrationModel {
        let mut guard = self.inner.write();
        guard.active.insert(model.project_id, model.id);
        guard.models.insert(model.id, model.clone());
        model
    }

    /// Make `id` the active model of its project. `None` if unknown.
    pub fn activate(&self, id: ModelId) -> Option<CalibrationModel> {
        let mut guard = self.inner.write();
        let model = guard.models.get(&id)?.clone();
        guard.active.insert(model.project_id, id);
        Some(model)
    }

    /// The project's active model, if any.
    pub fn active(&self, project_id: ProjectId) -> Option<CalibrationModel> {
        let guard = self.inner.read();
        guard
            .active
            .get(&project_id)
            .and_then(|id| guard.models.get(id))
            .cloned()
    }

    /// Number of stored models across all projects.
    pub fn len(&self) -> usize {
        self.inner.read().models.len()
    }

    /// Whether no model has been generated yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All models generated for a project, newest first.
    pub fn list(&self, project_id: ProjectId) -> Vec<ModelListing> {
        let guard = self.inner.read();
        let active = guard.active.get(&project_id).copied();
        let mut listings: Vec<ModelListing> = guard
            .models
            .values()
            .filter(|m| m.project_id == project_id)
            .map(|m| ModelListing {
                model: m.clone(),
                is_active: Some(m.id) == active,
            })
            .collect();
        listings.sort_by(|a, b| {
            b.model
                .created_at
                .cmp(&a.model.created_at)
                .then_with(|| b.model.id.cmp(&a.model.id))
        });
        listings
    }
}

// -- Configuration ------------------------------------------------------------

/// Configuration error raised while reading the environment.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A variable is present but not parseable.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// Absolute rating thresholds are inverted.
    #[error("SONREB_FAIR_MIN_ABS ({fair}) must not exceed SONREB_GOOD_MIN_ABS ({good})")]
    InvertedThresholds { good: f64, fair: f64 },
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Rating cut-offs applied when scoring readings.
    pub thresholds: RatingThresholds,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            thresholds: RatingThresholds::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    ///
    /// Reads `PORT`, `AUTH_TOKEN`, `SONREB_GOOD_MIN_ABS`, and
    /// `SONREB_FAIR_MIN_ABS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            config.port = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?;
        }

        config.auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());

        if let Some(value) = parse_threshold(&lookup, "SONREB_GOOD_MIN_ABS")? {
            config.thresholds.good_min_abs = value;
        }
        if let Some(value) = parse_threshold(&lookup, "SONREB_FAIR_MIN_ABS")? {
            config.thresholds.fair_min_abs = value;
        }
        if config.thresholds.fair_min_abs > config.thresholds.good_min_abs {
            return Err(ConfigError::InvertedThresholds {
                good: config.thresholds.good_min_abs,
                fair: config.thresholds.fair_min_abs,
            });
        }

        Ok(config)
    }
}

fn parse_threshold(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<f64>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(Some(value)),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub projects: Store<ProjectId, ProjectRecord>,
    pub points: Store<PointId, CalibrationPoint>,
    pub readings: Store<ReadingId, ReadingRecord>,
    pub models: ModelRegistry,
}

impl AppState {
    /// Create state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            projects: Store::new(),
            points: Store::new(),
            readings: Store::new(),
            models: ModelRegistry::new(),
        }
    }

    /// A project's calibration points, newest first.
    pub fn project_points(&self, project_id: ProjectId) -> Vec<CalibrationPoint> {
        let mut points = self.points.filter(|p| p.project_id == project_id);
        points.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        points
    }

    /// A project's readings, newest first.
    pub fn project_readings(&self, project_id: ProjectId) -> Vec<ReadingRecord> {
        let mut readings = self.readings.filter(|r| r.project_id == project_id);
        readings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        readings
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
