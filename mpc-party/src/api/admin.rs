//! Admin-only routes: certificate retrieval and the two MPC entry points.
//!
//! Every route here sits behind [`require_api_key`], which compares the caller's
//! `X-API-Key` header against the configured shared secret.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mpc_types::api::party::{
    GetPartyCertResponse, RequestQueryingComputationMpcRequest,
    RequestQueryingComputationMpcResponse, RequestSharingDataMpcRequest,
    RequestSharingDataMpcResponse,
};
use secrecy::{ExposeSecret, SecretString};

use crate::api::errors::Error;
use crate::services::party_engine::PartyEngine;

#[derive(Clone)]
struct AdminState {
    engine: Arc<PartyEngine>,
    api_key: SecretString,
}

/// Builds the admin API router, gated by the shared API key.
pub fn routes(engine: Arc<PartyEngine>, api_key: SecretString) -> Router {
    let state = AdminState { engine, api_key };
    Router::new()
        .route("/get_party_cert", get(get_party_cert))
        .route("/request_sharing_data_mpc", post(request_sharing_data_mpc))
        .route(
            "/request_querying_computation_mpc",
            post(request_querying_computation_mpc),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

async fn require_api_key(
    State(state): State<AdminState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let presented = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if key == state.api_key.expose_secret() => next.run(request).await,
        _ => Error::Unauthorized.into_response(),
    }
}

async fn get_party_cert(
    State(state): State<AdminState>,
) -> Result<Json<GetPartyCertResponse>, Error> {
    let cert_file = state.engine.get_party_cert().await?;
    Ok(Json(GetPartyCertResponse {
        party_id: state.engine.party_id(),
        cert_file,
    }))
}

async fn request_sharing_data_mpc(
    State(state): State<AdminState>,
    Json(req): Json<RequestSharingDataMpcRequest>,
) -> Result<Json<RequestSharingDataMpcResponse>, Error> {
    let data_commitment = state.engine.request_sharing_data_mpc(req).await?;
    Ok(Json(RequestSharingDataMpcResponse { data_commitment }))
}

async fn request_querying_computation_mpc(
    State(state): State<AdminState>,
    Json(req): Json<RequestQueryingComputationMpcRequest>,
) -> Result<(StatusCode, Json<RequestQueryingComputationMpcResponse>), Error> {
    let stats = state.engine.request_querying_computation_mpc(req).await?;
    Ok((
        StatusCode::OK,
        Json(RequestQueryingComputationMpcResponse { stats }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use mpc_types::session::PartyId;

    fn test_engine(data_dir: std::path::PathBuf) -> Arc<PartyEngine> {
        let config = crate::config::PartyConfig {
            party_id: PartyId(0),
            api_key: SecretString::from("shared-secret".to_string()),
            max_data_providers: 1_000_000,
            fixed_point_scale: 100,
            data_dir,
            verifier_bin: "/bin/true".into(),
            compiler_bin: "/bin/true".into(),
            vm_bin: "/bin/true".into(),
            rehash_bin: "/bin/true".into(),
            host: "127.0.0.1".to_string(),
            peer_hosts: vec!["127.0.0.1:0".to_string()],
        };
        Arc::new(PartyEngine::new(
            &config,
            Arc::new(mpc_test_utils::FakeProofVerifier::rejecting("unused")),
            Arc::new(mpc_test_utils::FakeProgramCompiler),
            Arc::new(mpc_test_utils::FakeProgramRunner::fixed("deadbeef")),
            Arc::new(mpc_test_utils::FakeCertRehasher::default()),
        ))
    }

    fn test_server() -> TestServer {
        let data_dir = std::env::temp_dir().join("mpc-party-admin-api-test-unauthorized");
        let engine = test_engine(data_dir);
        let router = routes(engine, SecretString::from("shared-secret".to_string()));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn get_party_cert_without_api_key_is_rejected() {
        let server = test_server();
        let response = server.get("/get_party_cert").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_party_cert_with_wrong_api_key_is_rejected() {
        let server = test_server();
        let response = server
            .get("/get_party_cert")
            .add_header("X-API-Key", "wrong-secret")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_party_cert_with_valid_api_key_reads_the_cert_file() {
        let data_dir = std::env::temp_dir().join("mpc-party-admin-api-test-valid-key");
        tokio::fs::create_dir_all(data_dir.join("Player-Data"))
            .await
            .unwrap();
        tokio::fs::write(data_dir.join("Player-Data").join("0.pem"), "party-cert-pem")
            .await
            .unwrap();
        let engine = test_engine(data_dir);
        let router = routes(engine, SecretString::from("shared-secret".to_string()));
        let server = TestServer::new(router).unwrap();

        let response = server
            .get("/get_party_cert")
            .add_header("X-API-Key", "shared-secret")
            .await;
        response.assert_status_ok();
        let body: GetPartyCertResponse = response.json();
        assert_eq!(body.cert_file, "party-cert-pem");
    }
}
