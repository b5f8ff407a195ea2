//! Public sharing/query routes: the two entry points that drive a party fanout.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use mpc_types::api::coordinator::{
    QueryComputationRequest, QueryComputationResponse, ShareDataRequest, ShareDataResponse,
};

use crate::api::errors::Error;
use crate::services::coordinator::CoordinatorService;

/// Builds the sharing/query router.
pub(crate) fn routes(coordinator: CoordinatorService) -> Router {
    Router::new()
        .route("/share_data", post(share_data))
        .route("/query_computation", post(query_computation))
        .with_state(coordinator)
}

async fn share_data(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<ShareDataRequest>,
) -> Result<Json<ShareDataResponse>, Error> {
    let client_port_base = coordinator.share_data(req).await?;
    Ok(Json(ShareDataResponse { client_port_base }))
}

async fn query_computation(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<QueryComputationRequest>,
) -> Result<Json<QueryComputationResponse>, Error> {
    let (client_port_base, _stats) = coordinator.query_computation(req).await?;
    Ok(Json(QueryComputationResponse { client_port_base }))
}
