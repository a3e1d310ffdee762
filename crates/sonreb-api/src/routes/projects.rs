//! # Projects API
//!
//! Project records carry the design strength used for design-ratio rating,
//! plus the headline summary and full report over a project's readings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use sonreb_calibration::{project_summary, report_summary, ProjectSummary, ReportSummary, ScoredReading};
use sonreb_core::ProjectId;

use super::require_project;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_positive, Validate};
use crate::state::{AppState, ProjectRecord};

/// Create project request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Specified compressive strength, MPa.
    #[serde(default)]
    pub design_fc: Option<f64>,
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if let Some(design_fc) = self.design_fc {
            require_positive("design_fc", design_fc)?;
        }
        Ok(())
    }
}

/// Build the projects router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/projects", post(create_project))
        .route("/v1/projects/{id}", get(get_project))
        .route("/v1/projects/{id}/summary", get(get_summary))
        .route("/v1/projects/{id}/report", get(get_report))
}

/// POST /v1/projects: Create a project.
#[utoipa::path(
    post,
    path = "/v1/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let record = ProjectRecord {
        id: ProjectId::new(),
        name: req.name.trim().to_string(),
        location: req.location.filter(|l| !l.trim().is_empty()),
        design_fc: req.design_fc,
        created_at: Utc::now(),
    };
    state.projects.insert(record.id, record.clone());
    tracing::info!(project_id = %record.id, "project created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/projects/{id}: Get a project.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectRecord>, AppError> {
    require_project(&state, ProjectId::from_uuid(id)).map(Json)
}

/// GET /v1/projects/{id}/summary: Readings count, strength range, rating counts.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}/summary",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project summary"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectSummary>, AppError> {
    let project = require_project(&state, ProjectId::from_uuid(id))?;
    Ok(Json(project_summary(&scored_readings(&state, project.id))))
}

/// GET /v1/projects/{id}/report: Report summary against the active model.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}/report",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Report summary"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportSummary>, AppError> {
    let project = require_project(&state, ProjectId::from_uuid(id))?;
    let readings = scored_readings(&state, project.id);
    let cores = state.project_points(project.id);
    let model = state.models.active(project.id);
    Ok(Json(report_summary(
        &readings,
        &cores,
        model.as_ref(),
        project.design_fc,
    )))
}

fn scored_readings(state: &AppState, project_id: ProjectId) -> Vec<ScoredReading> {
    state
        .project_readings(project_id)
        .into_iter()
        .map(|r| r.scored)
        .collect()
}
