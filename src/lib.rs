pub mod broker;
pub mod config;
pub mod http;
pub mod message;
pub mod metrics;
pub mod session;
pub mod state;
pub mod store;

pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

/// Assembles the full route table: the admin room/peer surface, the join
/// (WebSocket upgrade) endpoint, and — when enabled — `/metrics`.
///
/// Per-route method fallbacks give a non-empty `"Method Not Allowed\n"`
/// body (axum's built-in 405 has an empty one); the router-level fallback
/// covers genuinely unknown paths with `"Not Found\n"`.
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route(
            "/rooms",
            post(http::rooms::create_room).fallback(method_not_allowed),
        )
        .route(
            "/rooms/:room/peers",
            post(http::rooms::register_peer).fallback(method_not_allowed),
        )
        .route(
            "/rooms/:room/ws",
            get(http::ws::join_room).fallback(method_not_allowed),
        );

    if let Some(handle) = metrics_handle {
        router = router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { crate::metrics::render(handle).await }
            })
            .fallback(method_not_allowed),
        );
    }

    router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found\n").into_response()
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n").into_response()
}
