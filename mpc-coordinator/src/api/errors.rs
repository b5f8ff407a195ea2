//! HTTP error mapping for the coordinator's public API.

use axum::Json;
use axum::response::{IntoResponse, Response};
use mpc_types::error_codes::ErrorKind;
use serde::Serialize;

use crate::services::consumer_cache::ConsumerCacheError;
use crate::services::coordinator::CoordinatorError;

/// All errors the public API may return, already carrying their error kind.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    ConsumerCache(#[from] ConsumerCacheError),
}

impl Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Coordinator(CoordinatorError::NotHead) => ErrorKind::QueueFullOrNotHead,
            Error::Coordinator(CoordinatorError::ClientIdOutOfRange(_))
            | Error::Coordinator(CoordinatorError::DuplicateUid(_)) => ErrorKind::InvalidRequest,
            Error::Coordinator(CoordinatorError::ProofInvalid(_)) => ErrorKind::ProofInvalid,
            Error::Coordinator(CoordinatorError::CommitmentMismatch)
            | Error::Coordinator(CoordinatorError::StatsMismatch) => {
                ErrorKind::CommitmentMismatch
            }
            Error::Coordinator(CoordinatorError::PeerFailure(_))
            | Error::Coordinator(CoordinatorError::FanoutTimeout) => ErrorKind::PeerFailure,
            Error::Coordinator(CoordinatorError::LocalFailure(_)) => ErrorKind::LocalFailure,
            Error::ConsumerCache(ConsumerCacheError::Populating) => ErrorKind::CacheUninitialized,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{self}");
        let status = self.kind().status();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
