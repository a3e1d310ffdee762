//! # Prometheus Metrics
//!
//! HTTP request counters and latency histograms recorded in middleware, plus
//! store-size gauges refreshed on every `/metrics` scrape. Served in the
//! Prometheus text exposition format.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

/// Latency buckets, seconds.
const LATENCY_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    projects_total: IntGauge,
    calibration_points_total: IntGauge,
    models_total: IntGauge,
    readings_total: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a metrics instance with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("sonreb_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "sonreb_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "path", "status"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("sonreb_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;

        let projects_total = IntGauge::new("sonreb_projects_total", "Stored projects")?;
        let calibration_points_total =
            IntGauge::new("sonreb_calibration_points_total", "Stored calibration points")?;
        let models_total = IntGauge::new("sonreb_models_total", "Generated calibration models")?;
        let readings_total = IntGauge::new("sonreb_readings_total", "Stored scored readings")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(projects_total.clone()))?;
        registry.register(Box::new(calibration_points_total.clone()))?;
        registry.register(Box::new(models_total.clone()))?;
        registry.register(Box::new(readings_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                projects_total,
                calibration_points_total,
                models_total,
                readings_total,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        counter_sum(&self.inner.http_requests_total)
    }

    /// Total 4xx and 5xx count across all labels.
    pub fn errors(&self) -> u64 {
        counter_sum(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.inner.http_requests_total.with_label_values(&labels).inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&labels)
            .observe(duration_secs);
        if status.starts_with('4') || status.starts_with('5') {
            self.inner.http_errors_total.with_label_values(&labels).inc();
        }
    }

    /// Refresh the store-size gauges from `state`.
    fn observe_state(&self, state: &AppState) {
        self.inner.projects_total.set(gauge_value(state.projects.len()));
        self.inner
            .calibration_points_total
            .set(gauge_value(state.points.len()));
        self.inner.models_total.set(gauge_value(state.models.len()));
        self.inner.readings_total.set(gauge_value(state.readings.len()));
    }

    /// Gather all metrics and encode them in the text exposition format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn counter_sum(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

fn gauge_value(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Replace UUID path segments with `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::try_parse(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count, latency, and errors.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}

/// Router serving the scrape endpoint. Mounted outside authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

/// GET /metrics: Prometheus scrape endpoint.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus text exposition", content_type = "text/plain", body = String),
        (status = 500, description = "Encoding failed", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Response, AppError> {
    metrics.observe_state(&state);
    let body = metrics.gather_and_encode().map_err(AppError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use tower::ServiceExt;

    fn metrics() -> ApiMetrics {
        ApiMetrics::new().unwrap()
    }

    #[test]
    fn new_metrics_start_at_zero() {
        let m = metrics();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_counted_only_for_4xx_and_5xx() {
        let m = metrics();
        m.record_request("GET", "/v1/readings", 200, 0.01);
        m.record_request("POST", "/v1/readings", 201, 0.02);
        m.record_request("POST", "/v1/calibration/generate", 422, 0.01);
        m.record_request("GET", "/v1/projects/{id}", 404, 0.001);
        m.record_request("GET", "/v1/projects/{id}/report", 500, 0.3);
        assert_eq!(m.requests(), 5);
        assert_eq!(m.errors(), 3);
    }

    #[test]
    fn clones_share_the_registry() {
        let m = metrics();
        let clone = m.clone();
        m.record_request("GET", "/metrics", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn exposition_carries_latency_per_status() {
        let m = metrics();
        m.record_request("POST", "/v1/readings", 201, 0.02);
        m.record_request("POST", "/v1/readings", 422, 0.01);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("sonreb_http_requests_total"));
        assert!(text.contains("sonreb_http_request_duration_seconds_bucket"));
        assert!(text.contains(r#"status="201""#));
        assert!(text.contains(r#"status="422""#));
    }

    #[test]
    fn gauges_reflect_store_sizes() {
        let m = metrics();
        let state = AppState::new();
        m.observe_state(&state);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("sonreb_projects_total 0"));
        assert!(text.contains("sonreb_readings_total 0"));
    }

    #[test]
    fn uuid_segments_are_normalized() {
        assert_eq!(
            normalize_path("/v1/calibration/models/550e8400-e29b-41d4-a716-446655440000/activate"),
            "/v1/calibration/models/{id}/activate"
        );
        assert_eq!(normalize_path("/v1/calibration/points"), "/v1/calibration/points");
    }

    #[tokio::test]
    async fn middleware_counts_requests_and_errors() {
        let m = metrics();
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/bad", get(|| async { StatusCode::BAD_REQUEST }))
            .layer(from_fn(metrics_middleware))
            .layer(Extension(m.clone()));

        for uri in ["/ok", "/ok", "/bad"] {
            app.clone()
                .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 1);
    }
}
