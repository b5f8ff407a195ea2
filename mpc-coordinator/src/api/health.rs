//! Health check endpoint.
//!
//! `/health` has a `Cache-Control: no-cache` header to prevent caching of responses.

use axum::Router;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use nodes_common::StartedServices;
use tower_http::set_header::SetResponseHeaderLayer;

/// Builds the health-check router.
pub(crate) fn routes(started_services: StartedServices) -> Router {
    Router::new()
        .route("/health", get(move || health(started_services)))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
}

async fn health(started_services: StartedServices) -> impl IntoResponse {
    if started_services.all_started() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}
