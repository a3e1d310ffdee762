//! # Calibration API
//!
//! Core-verified calibration points, model generation and activation, and
//! diagnostics for the active model.
//!
//! Generation fits on a snapshot of the project's points taken under the
//! store's read guard; points added while the fit runs are not observed.
//! The fitted model is stored and made active in one registry update.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use sonreb_calibration::diagnostics::DEFAULT_BIN_COUNT;
use sonreb_calibration::{evaluate_with_bins, fit, CalibrationModel, Diagnostics};
use sonreb_core::{CalibrationPoint, MemberId, ModelId, PointId, ProjectId};

use super::{extract_query, require_project, ProjectQuery};
use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_validated_json, require_non_negative, require_positive, Validate,
};
use crate::state::{AppState, ModelListing};

/// Upper bound on residual histogram bins.
const MAX_BINS: usize = 100;

/// Measured values of a calibration point.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PointValues {
    /// Structural member the core was drilled from.
    #[serde(default)]
    pub member_id: Option<Uuid>,
    /// Ultrasonic pulse velocity, m/s.
    pub upv: f64,
    /// Rebound hammer index.
    #[serde(alias = "rh_index")]
    pub rebound_index: f64,
    /// Carbonation depth, mm.
    #[serde(default)]
    pub carbonation_depth: Option<f64>,
    /// Core compressive strength, MPa.
    pub core_fc: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for PointValues {
    fn validate(&self) -> Result<(), String> {
        require_positive("upv", self.upv)?;
        require_positive("rebound_index", self.rebound_index)?;
        require_positive("core_fc", self.core_fc)?;
        require_non_negative("carbonation_depth", self.carbonation_depth)
    }
}

impl PointValues {
    fn into_point(self, id: PointId, project_id: ProjectId) -> CalibrationPoint {
        CalibrationPoint {
            id,
            project_id,
            member_id: self.member_id.map(MemberId::from_uuid),
            upv: self.upv,
            rebound_index: self.rebound_index,
            carbonation_depth: self.carbonation_depth,
            core_fc: self.core_fc,
            notes: self.notes.unwrap_or_default(),
            created_at: Utc::now(),
        }
    }
}

/// Create calibration point request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePointRequest {
    pub project_id: Uuid,
    #[serde(flatten)]
    pub values: PointValues,
}

impl Validate for CreatePointRequest {
    fn validate(&self) -> Result<(), String> {
        self.values.validate()
    }
}

/// Model generation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateModelRequest {
    pub project_id: Uuid,
    /// Include carbonation depth as a regressor (needs 8 points).
    #[serde(default)]
    pub use_carbonation: bool,
}

/// `?project=<uuid>&bins=<n>` for diagnostics.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DiagnosticsQuery {
    pub project: Uuid,
    /// Residual histogram bins, default 8.
    #[serde(default)]
    pub bins: Option<usize>,
}

/// Build the calibration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/calibration/points", post(create_point).get(list_points))
        .route(
            "/v1/calibration/points/{id}",
            put(replace_point).delete(delete_point),
        )
        .route("/v1/calibration/generate", post(generate_model))
        .route("/v1/calibration/models", get(list_models))
        .route("/v1/calibration/models/{id}/activate", post(activate_model))
        .route("/v1/calibration/model", get(active_model))
        .route("/v1/calibration/diagnostics", get(diagnostics))
}

/// POST /v1/calibration/points: Record a core-verified point.
#[utoipa::path(
    post,
    path = "/v1/calibration/points",
    request_body = CreatePointRequest,
    responses(
        (status = 201, description = "Point created"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn create_point(
    State(state): State<AppState>,
    body: Result<Json<CreatePointRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CalibrationPoint>), AppError> {
    let req = extract_validated_json(body)?;
    let project = require_project(&state, ProjectId::from_uuid(req.project_id))?;
    let point = req.values.into_point(PointId::new(), project.id);
    state.points.insert(point.id, point.clone());
    tracing::debug!(point_id = %point.id, project_id = %project.id, "calibration point recorded");
    Ok((StatusCode::CREATED, Json(point)))
}

/// GET /v1/calibration/points: List a project's points, newest first.
#[utoipa::path(
    get,
    path = "/v1/calibration/points",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Calibration points"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn list_points(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<Vec<CalibrationPoint>>, AppError> {
    let query = extract_query(query)?;
    let project = require_project(&state, ProjectId::from_uuid(query.project))?;
    Ok(Json(state.project_points(project.id)))
}

/// PUT /v1/calibration/points/{id}: Corrective full replace.
///
/// The point keeps its identifier and project; every measured value is
/// replaced. Models already generated are not refitted.
#[utoipa::path(
    put,
    path = "/v1/calibration/points/{id}",
    params(("id" = Uuid, Path, description = "Point ID")),
    request_body = PointValues,
    responses(
        (status = 200, description = "Point replaced"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn replace_point(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<PointValues>, JsonRejection>,
) -> Result<Json<CalibrationPoint>, AppError> {
    let values = extract_validated_json(body)?;
    let id = PointId::from_uuid(id);
    let existing = state
        .points
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))?;
    let mut replacement = values.into_point(id, existing.project_id);
    replacement.created_at = existing.created_at;
    state
        .points
        .update(&id, |p| *p = replacement)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))
}

/// DELETE /v1/calibration/points/{id}: Delete a point.
#[utoipa::path(
    delete,
    path = "/v1/calibration/points/{id}",
    params(("id" = Uuid, Path, description = "Point ID")),
    responses(
        (status = 204, description = "Point deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn delete_point(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = PointId::from_uuid(id);
    state
        .points
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))
}

/// POST /v1/calibration/generate: Fit, store, and activate a model.
#[utoipa::path(
    post,
    path = "/v1/calibration/generate",
    request_body = GenerateModelRequest,
    responses(
        (status = 201, description = "Model generated and activated"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
        (status = 422, description = "Insufficient or degenerate data", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn generate_model(
    State(state): State<AppState>,
    body: Result<Json<GenerateModelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CalibrationModel>), AppError> {
    let req = extract_json(body)?;
    let project = require_project(&state, ProjectId::from_uuid(req.project_id))?;

    let snapshot = state.points.filter(|p| p.project_id == project.id);
    let model = fit(&snapshot, req.use_carbonation).map_err(|err| {
        tracing::warn!(project_id = %project.id, error = %err, "model generation rejected");
        err
    })?;

    let model = state.models.insert_and_activate(model);
    tracing::info!(
        project_id = %project.id,
        model_id = %model.id,
        points_used = model.points_used,
        r2 = model.r2,
        "calibration model generated and activated"
    );
    Ok((StatusCode::CREATED, Json(model)))
}

/// GET /v1/calibration/models: Every model generated for a project.
#[utoipa::path(
    get,
    path = "/v1/calibration/models",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Models, newest first"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn list_models(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<Vec<ModelListing>>, AppError> {
    let query = extract_query(query)?;
    let project = require_project(&state, ProjectId::from_uuid(query.project))?;
    Ok(Json(state.models.list(project.id)))
}

/// POST /v1/calibration/models/{id}/activate: Make a model its project's active model.
#[utoipa::path(
    post,
    path = "/v1/calibration/models/{id}/activate",
    params(("id" = Uuid, Path, description = "Model ID")),
    responses(
        (status = 200, description = "Model activated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn activate_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CalibrationModel>, AppError> {
    let id = ModelId::from_uuid(id);
    let model = state
        .models
        .activate(id)
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))?;
    tracing::info!(project_id = %model.project_id, model_id = %model.id, "model activated");
    Ok(Json(model))
}

/// GET /v1/calibration/model: The project's active model.
#[utoipa::path(
    get,
    path = "/v1/calibration/model",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Active model"),
        (status = 404, description = "No active model", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn active_model(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<CalibrationModel>, AppError> {
    let query = extract_query(query)?;
    let project = require_project(&state, ProjectId::from_uuid(query.project))?;
    state
        .models
        .active(project.id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no active model for {}", project.id)))
}

/// GET /v1/calibration/diagnostics: Predicted vs measured for the active model.
#[utoipa::path(
    get,
    path = "/v1/calibration/diagnostics",
    params(DiagnosticsQuery),
    responses(
        (status = 200, description = "Diagnostics"),
        (status = 404, description = "No active model", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid bin count", body = crate::error::ErrorBody),
    ),
    tag = "calibration"
)]
pub async fn diagnostics(
    State(state): State<AppState>,
    query: Result<Query<DiagnosticsQuery>, QueryRejection>,
) -> Result<Json<Diagnostics>, AppError> {
    let query = extract_query(query)?;
    let bins = query.bins.unwrap_or(DEFAULT_BIN_COUNT);
    if bins == 0 || bins > MAX_BINS {
        return Err(AppError::Validation(format!(
            "bins must be between 1 and {MAX_BINS}, got {bins}"
        )));
    }

    let project = require_project(&state, ProjectId::from_uuid(query.project))?;
    let model = state
        .models
        .active(project.id)
        .ok_or_else(|| AppError::NotFound(format!("no active model for {}", project.id)))?;
    let points = state.project_points(project.id);
    Ok(Json(evaluate_with_bins(&model, &points, bins)))
}
