//! Public queue-admission routes.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use mpc_types::api::coordinator::{
    AddUserToQueueRequest, AddUserToQueueResponse, FinishComputationRequest,
    FinishComputationResponse, GetPositionRequest, GetPositionResponse,
    HasAddressSharedDataQuery, HasAddressSharedDataResponse, RedeemVoucherRequest,
    RedeemVoucherResponse, ValidateComputationKeyRequest, ValidateComputationKeyResponse,
};

use crate::api::errors::Error;
use crate::services::coordinator::CoordinatorService;

/// Builds the queue-admission router.
pub(crate) fn routes(coordinator: CoordinatorService) -> Router {
    Router::new()
        .route("/add_user_to_queue", post(add_user_to_queue))
        .route(
            "/add_priority_user_to_queue",
            post(add_priority_user_to_queue),
        )
        .route("/get_position", post(get_position))
        .route("/validate_computation_key", post(validate_computation_key))
        .route("/finish_computation", post(finish_computation))
        .route("/has_address_shared_data", get(has_address_shared_data))
        .route("/redeem_voucher", post(redeem_voucher))
        .with_state(coordinator)
}

async fn add_user_to_queue(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<AddUserToQueueRequest>,
) -> Result<Json<AddUserToQueueResponse>, Error> {
    let result = coordinator.add_user(req.access_key).await?;
    Ok(Json(AddUserToQueueResponse { result }))
}

async fn add_priority_user_to_queue(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<AddUserToQueueRequest>,
) -> Result<Json<AddUserToQueueResponse>, Error> {
    let result = coordinator.add_priority_user(req.access_key).await?;
    Ok(Json(AddUserToQueueResponse { result }))
}

async fn get_position(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<GetPositionRequest>,
) -> Json<GetPositionResponse> {
    let (position, computation_key) = coordinator.get_position(&req.access_key);
    Json(GetPositionResponse {
        position,
        computation_key,
    })
}

async fn validate_computation_key(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<ValidateComputationKeyRequest>,
) -> Json<ValidateComputationKeyResponse> {
    let is_valid = coordinator.validate_computation_key(&req);
    Json(ValidateComputationKeyResponse { is_valid })
}

async fn finish_computation(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<FinishComputationRequest>,
) -> Json<FinishComputationResponse> {
    let is_finished = coordinator.finish_computation(&req);
    Json(FinishComputationResponse { is_finished })
}

async fn has_address_shared_data(
    State(coordinator): State<CoordinatorService>,
    Query(query): Query<HasAddressSharedDataQuery>,
) -> Result<Json<HasAddressSharedDataResponse>, Error> {
    let has_shared_data = coordinator
        .has_address_shared_data(&query.eth_address)
        .await
        .map_err(|e| crate::services::coordinator::CoordinatorError::LocalFailure(e.to_string()))?;
    Ok(Json(HasAddressSharedDataResponse { has_shared_data }))
}

async fn redeem_voucher(
    State(coordinator): State<CoordinatorService>,
    Json(req): Json<RedeemVoucherRequest>,
) -> Result<Json<RedeemVoucherResponse>, Error> {
    let redeemed = coordinator.redeem_voucher(&req.code, &req.access_key).await?;
    Ok(Json(RedeemVoucherResponse { redeemed }))
}
