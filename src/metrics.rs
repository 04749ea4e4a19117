//! Process-wide counters exported over HTTP in Prometheus text format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global Prometheus recorder. Call once at startup; returns
/// the handle used to render `/metrics` responses.
pub fn install() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder")
}

pub async fn render(handle: PrometheusHandle) -> Response {
    (StatusCode::OK, handle.render()).into_response()
}
