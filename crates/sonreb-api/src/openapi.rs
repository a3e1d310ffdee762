//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SonReb Calibration API",
        version = "0.1.0",
        description = "Project-specific SonReb calibration: core-verified points, power-law model generation, reading estimation, diagnostics, and project reports."
    ),
    paths(
        // Projects
        crate::routes::projects::create_project,
        crate::routes::projects::get_project,
        crate::routes::projects::get_summary,
        crate::routes::projects::get_report,
        // Calibration
        crate::routes::calibration::create_point,
        crate::routes::calibration::list_points,
        crate::routes::calibration::replace_point,
        crate::routes::calibration::delete_point,
        crate::routes::calibration::generate_model,
        crate::routes::calibration::list_models,
        crate::routes::calibration::activate_model,
        crate::routes::calibration::active_model,
        crate::routes::calibration::diagnostics,
        // Readings
        crate::routes::readings::create_reading,
        crate::routes::readings::list_readings,
        // Operations
        crate::middleware::metrics::prometheus_metrics,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::projects::CreateProjectRequest,
        crate::routes::calibration::PointValues,
        crate::routes::calibration::CreatePointRequest,
        crate::routes::calibration::GenerateModelRequest,
        crate::routes::readings::CreateReadingRequest,
    )),
    tags(
        (name = "projects", description = "Projects, summaries and reports"),
        (name = "calibration", description = "Calibration points and models"),
        (name = "readings", description = "Field reading estimation"),
        (name = "operations", description = "Prometheus metrics"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
