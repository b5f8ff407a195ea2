//! HTTP error mapping for the party admin API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::services::party_engine::PartyEngineError;

/// All errors the admin API may return, already carrying their HTTP status.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    /// The caller's `X-API-Key` header was missing or did not match.
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Engine(#[from] PartyEngineError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{self}");
        let status = match &self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Engine(PartyEngineError::SecretIndexOutOfRange(_))
            | Error::Engine(PartyEngineError::ProofInvalid(_))
            | Error::Engine(PartyEngineError::NoShareFile) => StatusCode::BAD_REQUEST,
            Error::Engine(PartyEngineError::PeerFetchFailed(_))
            | Error::Engine(PartyEngineError::Local(_))
            | Error::Engine(PartyEngineError::Io(_))
            | Error::Engine(PartyEngineError::CertRehash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
