//! The named error taxonomy shared by every HTTP surface in the cluster.
//!
//! Each kind below maps to exactly one HTTP status code; the coordinator and party
//! services each define their own `thiserror` enum for their local failure modes, but
//! every variant of those enums maps into one of these kinds via [`ErrorKind::status`].

use http::StatusCode;

/// The abstract error kinds named in the cluster's error handling design.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad `client_id`, `access_key`, `computation_key`, or a duplicate `uid`.
    ///
    /// No state change.
    InvalidRequest,
    /// The external notarization proof verifier rejected the proof.
    ///
    /// No state change.
    ProofInvalid,
    /// Parties returned differing commitment hex, or the verifier's hash disagreed
    /// with the parties'.
    ///
    /// The sharing session is aborted and its share file rolled back.
    CommitmentMismatch,
    /// A party returned a non-success status, timed out, or was unreachable.
    ///
    /// The sharing session is aborted and its share file rolled back.
    PeerFailure,
    /// A template render, compile, or VM run failed, or local file I/O failed.
    ///
    /// The sharing session is aborted and its share file rolled back.
    LocalFailure,
    /// The queue was full, or the caller was not the current queue head.
    ///
    /// No state change.
    QueueFullOrNotHead,
    /// The consumer cache has not populated yet.
    CacheUninitialized,
}

impl ErrorKind {
    /// The HTTP status this error kind is reported as.
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest
            | ErrorKind::ProofInvalid
            | ErrorKind::CommitmentMismatch
            | ErrorKind::QueueFullOrNotHead => StatusCode::BAD_REQUEST,
            ErrorKind::PeerFailure | ErrorKind::LocalFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorKind::CacheUninitialized => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
