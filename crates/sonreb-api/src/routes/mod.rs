//! # API Route Modules
//!
//! - `projects`: project records, summary and report.
//! - `calibration`: calibration points, model generation, activation,
//!   diagnostics.
//! - `readings`: scoring and listing field readings.

pub mod calibration;
pub mod projects;
pub mod readings;

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use sonreb_core::ProjectId;

use crate::error::AppError;
use crate::state::{AppState, ProjectRecord};

/// `?project=<uuid>` filter shared by the list endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    /// Owning project.
    pub project: Uuid,
}

/// Extract a query string, mapping parse failures to [`AppError::BadRequest`].
pub(crate) fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Look up a project or fail with 404.
pub(crate) fn require_project(state: &AppState, id: ProjectId) -> Result<ProjectRecord, AppError> {
    state
        .projects
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))
}
