//! Scrape and liveness endpoints.
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;

use cadence_prometheus::PrometheusMetrics;

/// Prometheus text exposition format.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Routes:
/// - GET /metrics - Prometheus text exposition
/// - GET /healthz - Liveness check
pub fn router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/healthz", get(healthz))
        .with_state(metrics)
}

async fn scrape(State(metrics): State<Arc<PrometheusMetrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use cadence_core::metrics::MetricsBackend;
    use tower::ServiceExt;

    use super::*;

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text_format() {
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        metrics.record_iteration();

        let (status, body) = get_body(router(metrics), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("cadence_iterations_total 1"));
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());

        let (status, body) = get_body(router(metrics), "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());

        let (status, _) = get_body(router(metrics), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
