//! # Readings API
//!
//! Scores a field reading with the project's active model (or the global
//! default when none is active) and stores it.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use sonreb_calibration::{predict, ScoredReading};
use sonreb_core::{MemberId, ProjectId, Reading, ReadingId};

use super::{extract_query, require_project, ProjectQuery};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AppState, ReadingRecord};

/// Score-and-store request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReadingRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    /// Grid or location label.
    #[serde(default)]
    pub location_tag: Option<String>,
    /// Ultrasonic pulse velocity, m/s.
    pub upv: f64,
    /// Rebound hammer index.
    #[serde(alias = "rh_index")]
    pub rebound_index: f64,
    /// Carbonation depth, mm.
    #[serde(default)]
    pub carbonation_depth: Option<f64>,
}

/// Build the readings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/readings", post(create_reading).get(list_readings))
}

/// POST /v1/readings: Score and store a reading.
///
/// Input validation is the predictor's: non-positive inputs and a missing
/// carbonation depth under a carbonation model come back as 422 with the
/// structured error kind.
#[utoipa::path(
    post,
    path = "/v1/readings",
    request_body = CreateReadingRequest,
    responses(
        (status = 201, description = "Reading scored and stored"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
        (status = 422, description = "Reading cannot be scored", body = crate::error::ErrorBody),
    ),
    tag = "readings"
)]
pub async fn create_reading(
    State(state): State<AppState>,
    body: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReadingRecord>), AppError> {
    let req = extract_json(body)?;
    let project = require_project(&state, ProjectId::from_uuid(req.project_id))?;

    let reading = Reading {
        upv: req.upv,
        rebound_index: req.rebound_index,
        carbonation_depth: req.carbonation_depth,
        design_fc: project.design_fc,
    };
    let model = state.models.active(project.id);
    let estimate = predict(&reading, model.as_ref(), &state.config.thresholds)?;

    let record = ReadingRecord {
        id: ReadingId::new(),
        project_id: project.id,
        member_id: req.member_id.map(MemberId::from_uuid),
        location_tag: req.location_tag.filter(|t| !t.trim().is_empty()),
        scored: ScoredReading { reading, estimate },
        created_at: Utc::now(),
    };

    if !record.scored.estimate.warnings.is_empty() {
        let flags: Vec<&str> = record
            .scored
            .estimate
            .warnings
            .iter()
            .map(|w| w.as_str())
            .collect();
        tracing::warn!(
            reading_id = %record.id,
            project_id = %project.id,
            warnings = ?flags,
            "reading outside calibrated range"
        );
    }

    state.readings.insert(record.id, record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/readings: A project's readings, newest first.
#[utoipa::path(
    get,
    path = "/v1/readings",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Readings"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
    ),
    tag = "readings"
)]
pub async fn list_readings(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<Vec<ReadingRecord>>, AppError> {
    let query = extract_query(query)?;
    let project = require_project(&state, ProjectId::from_uuid(query.project))?;
    Ok(Json(state.project_readings(project.id)))
}
