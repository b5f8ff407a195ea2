//! Request/response bodies for the coordinator's public API.

use serde::{Deserialize, Serialize};

use crate::queue::{AccessKey, AddUserResult, ComputationKey, QueuePosition};

/// `POST /add_user_to_queue`, `POST /add_priority_user_to_queue`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddUserToQueueRequest {
    /// The caller-chosen handle to admit.
    pub access_key: AccessKey,
}

/// Response to [`AddUserToQueueRequest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddUserToQueueResponse {
    /// Whether the entry was admitted, already present, or the queue was full.
    pub result: AddUserResult,
}

/// `POST /get_position`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetPositionRequest {
    /// The handle to look up.
    pub access_key: AccessKey,
}

/// Response to [`GetPositionRequest`].
///
/// Both fields are `None` when `access_key` is not currently queued.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetPositionResponse {
    /// The 0-based distance from the head of the queue.
    pub position: Option<QueuePosition>,
    /// The current head's one-time computation key, present only for the head itself.
    pub computation_key: Option<ComputationKey>,
}

/// `POST /validate_computation_key`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidateComputationKeyRequest {
    /// The handle claiming to be head.
    pub access_key: AccessKey,
    /// The key it was issued.
    pub computation_key: ComputationKey,
}

/// Response to [`ValidateComputationKeyRequest`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ValidateComputationKeyResponse {
    /// Whether `access_key` is head and `computation_key` matches its current key.
    pub is_valid: bool,
}

/// `POST /finish_computation`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinishComputationRequest {
    /// The handle claiming to be head.
    pub access_key: AccessKey,
    /// The key it was issued.
    pub computation_key: ComputationKey,
}

/// Response to [`FinishComputationRequest`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FinishComputationResponse {
    /// `true` the first time a valid (access_key, computation_key) pair is retired;
    /// `false` on any later call, including replays.
    pub is_finished: bool,
}

/// `POST /share_data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareDataRequest {
    /// The Ethereum address contributing the secret.
    pub eth_address: String,
    /// The notarization proof, opaque to the coordinator.
    pub tlsn_proof: String,
    /// The client's TLS certificate, PEM-encoded.
    pub client_cert_file: String,
    /// The client-chosen identifier used to namespace certs and ports.
    pub client_id: u32,
    /// The head's access key.
    pub access_key: AccessKey,
    /// The head's computation key.
    pub computation_key: ComputationKey,
}

/// Response to [`ShareDataRequest`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShareDataResponse {
    /// The first port of the client-side port window the client should dial.
    pub client_port_base: u16,
}

/// `POST /query_computation`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryComputationRequest {
    /// The client-chosen identifier used to namespace certs and ports.
    pub client_id: u32,
    /// The client's TLS certificate, PEM-encoded.
    pub client_cert_file: String,
    /// The head's access key.
    pub access_key: AccessKey,
    /// The head's computation key.
    pub computation_key: ComputationKey,
}

/// Response to [`QueryComputationRequest`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QueryComputationResponse {
    /// The first port of the client-side port window the client should dial.
    pub client_port_base: u16,
}

/// Query parameters for `GET /has_address_shared_data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HasAddressSharedDataQuery {
    /// The Ethereum address to check.
    pub eth_address: String,
}

/// Response to [`HasAddressSharedDataQuery`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HasAddressSharedDataResponse {
    /// Whether `eth_address` already has a persisted sharing session.
    pub has_shared_data: bool,
}

/// `POST /redeem_voucher`. Only meaningful when the coordinator was started with
/// voucher redemption enabled; otherwise the request is rejected outright.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedeemVoucherRequest {
    /// The one-time voucher code to redeem.
    pub code: String,
    /// The `access_key` the voucher is redeemed for; this is the key that later
    /// becomes admittable to the queue.
    pub access_key: AccessKey,
}

/// Response to [`RedeemVoucherRequest`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RedeemVoucherResponse {
    /// `true` on first redemption, `false` if already redeemed or never issued.
    pub redeemed: bool,
}
