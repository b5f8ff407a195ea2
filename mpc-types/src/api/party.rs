//! Request/response bodies for a party's admin-only API.
//!
//! Every endpoint here is gated behind the shared `X-API-Key` header; none of these
//! types carry the key itself, that lives in the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::api::consumer::QueryComputationStatsResponse;
use crate::proof::CommitmentHex;
use crate::session::PartyId;

/// Response to `GET /get_party_cert`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetPartyCertResponse {
    /// This party's id.
    pub party_id: PartyId,
    /// This party's certificate, PEM-encoded.
    pub cert_file: String,
}

/// `POST /request_sharing_data_mpc`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestSharingDataMpcRequest {
    /// The notarization proof, already verified by the coordinator.
    pub tlsn_proof: String,
    /// The first port of this session's server-side port window.
    pub mpc_port_base: u16,
    /// The index this secret occupies among all contributed secrets so far.
    pub secret_index: u64,
    /// The client-chosen identifier used to namespace certs and ports.
    pub client_id: u32,
    /// The first port of the client-side port window.
    pub client_port_base: u16,
    /// The client's TLS certificate, PEM-encoded.
    pub client_cert_file: String,
}

/// Response to [`RequestSharingDataMpcRequest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestSharingDataMpcResponse {
    /// The commitment hash this party's MPC run produced.
    pub data_commitment: CommitmentHex,
}

/// `POST /request_querying_computation_mpc`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestQueryingComputationMpcRequest {
    /// The number of data providers currently on record.
    pub num_data_providers: u64,
    /// The first port of this session's server-side port window.
    pub mpc_port_base: u16,
    /// The client-chosen identifier used to namespace certs and ports.
    pub client_id: u32,
    /// The first port of the client-side port window.
    pub client_port_base: u16,
    /// The client's TLS certificate, PEM-encoded.
    pub client_cert_file: String,
}

/// Response to [`RequestQueryingComputationMpcRequest`].
///
/// Carries the revealed aggregate statistics directly: every party's local MPC run
/// reveals the same public output, so there is no need for a caller to dial the MPC
/// ports itself the way the original client program did.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RequestQueryingComputationMpcResponse {
    /// The statistics this party's run of the query program revealed.
    pub stats: QueryComputationStatsResponse,
}
