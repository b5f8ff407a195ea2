//! The read-only consumer statistics endpoint, served from the [`ConsumerCache`].

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::errors::Error;
use crate::services::consumer_cache::ConsumerCache;

/// Builds the consumer statistics router.
pub(crate) fn routes(cache: Arc<ConsumerCache>) -> Router {
    Router::new()
        .route("/query-computation", get(query_computation))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .with_state(cache)
}

async fn query_computation(
    State(cache): State<Arc<ConsumerCache>>,
) -> Result<Json<mpc_types::api::consumer::QueryComputationStatsResponse>, Error> {
    let stats = cache.get().await?;
    Ok(Json(stats))
}
