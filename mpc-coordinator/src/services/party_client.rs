//! HTTP client wrapper for calling a party's admin API during fanout.
//!
//! One [`PartyClient`] per configured party host; the [`Coordinator`](super::coordinator::Coordinator)
//! holds a `Vec<PartyClient>` indexed by [`PartyId`] and fans out concurrently via
//! `futures::future::join_all`.

use mpc_types::api::party::{
    GetPartyCertResponse, RequestQueryingComputationMpcRequest,
    RequestQueryingComputationMpcResponse, RequestSharingDataMpcRequest,
    RequestSharingDataMpcResponse,
};
use mpc_types::session::PartyId;
use secrecy::{ExposeSecret as _, SecretString};

/// Everything that can go wrong calling a party's admin API.
#[derive(Debug, thiserror::Error)]
pub enum PartyClientError {
    /// The request could not be sent, or the connection failed.
    #[error("party {0} unreachable: {1}")]
    Unreachable(PartyId, String),
    /// The party responded with a non-200 status.
    #[error("party {0} returned {1}")]
    NonSuccess(PartyId, reqwest::StatusCode),
    /// The party's response body could not be decoded.
    #[error("party {0} sent an unreadable response: {1}")]
    MalformedResponse(PartyId, String),
}

/// A thin HTTP client for one party's admin API, carrying the shared API key.
#[derive(Clone)]
pub struct PartyClient {
    party_id: PartyId,
    base_url: String,
    api_key: SecretString,
    http: reqwest::Client,
}

impl PartyClient {
    /// Builds a client for `party_id` at `base_url` (e.g. `http://127.0.0.1:9001`).
    pub fn new(party_id: PartyId, base_url: String, api_key: SecretString) -> Self {
        Self {
            party_id,
            base_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// This client's party id.
    pub fn party_id(&self) -> PartyId {
        self.party_id
    }

    /// Calls `GET /get_party_cert`.
    pub async fn get_party_cert(&self) -> Result<GetPartyCertResponse, PartyClientError> {
        self.get("get_party_cert").await
    }

    /// Calls `POST /request_sharing_data_mpc`.
    pub async fn request_sharing_data_mpc(
        &self,
        req: &RequestSharingDataMpcRequest,
    ) -> Result<RequestSharingDataMpcResponse, PartyClientError> {
        self.post("request_sharing_data_mpc", req).await
    }

    /// Calls `POST /request_querying_computation_mpc`.
    pub async fn request_querying_computation_mpc(
        &self,
        req: &RequestQueryingComputationMpcRequest,
    ) -> Result<RequestQueryingComputationMpcResponse, PartyClientError> {
        self.post("request_querying_computation_mpc", req).await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, PartyClientError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .header("X-API-Key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| PartyClientError::Unreachable(self.party_id, e.to_string()))?;
        self.decode(response).await
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PartyClientError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .header("X-API-Key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| PartyClientError::Unreachable(self.party_id, e.to_string()))?;
        self.decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PartyClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PartyClientError::NonSuccess(self.party_id, status));
        }
        response
            .json()
            .await
            .map_err(|e| PartyClientError::MalformedResponse(self.party_id, e.to_string()))
    }
}
