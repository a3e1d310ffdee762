//! # sonreb-api: Axum API for the SonReb Engine
//!
//! HTTP surface over the calibration engine. State is held in memory; every
//! handler delegates the numerical work to `sonreb-calibration`.
//!
//! ## API Surface
//!
//! | Prefix                | Module                   | Domain                     |
//! |-----------------------|--------------------------|----------------------------|
//! | `/v1/projects/*`      | [`routes::projects`]     | Projects, summary, report  |
//! | `/v1/calibration/*`   | [`routes::calibration`]  | Points, models, diagnostics|
//! | `/v1/readings`        | [`routes::readings`]     | Reading estimation         |
//! | `/metrics`            | [`middleware::metrics`]  | Prometheus scrape (open)   |
//! | `/openapi.json`       | [`openapi`]              | OpenAPI document           |
//! | `/health/*`           | this module              | Probes (unauthenticated)   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use middleware::metrics::ApiMetrics;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so probes and scrapers need no credentials.
pub fn app(state: AppState, metrics: ApiMetrics) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::projects::router())
        .merge(routes::calibration::router())
        .merge(routes::readings::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics.clone()))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(middleware::metrics::router())
        .layer(axum::Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the stores are in memory, so ready once routed.
async fn readiness() -> &'static str {
    "ready"
}
