//! The result of a successful notarization-proof verification.
//!
//! The verifier itself is an external collaborator (see `mpc_engine::proof_verifier`);
//! this module only carries the data it hands back and the invariant the core enforces
//! over that data, so both the coordinator and every party engine check it the same
//! way.

use serde::{Deserialize, Serialize};

/// An opaque notarization proof, as received from a data provider.
///
/// Treated as an uninterpreted blob by everything except the external verifier: the
/// core never parses it itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofBlob(pub String);

/// A commitment hash, hex-encoded, as produced independently by the notarization
/// proof and by each party's MPC run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentHex(pub String);

/// A single 16-byte encoding delta extracted from the proof.
pub type EncodingDelta = [u8; 16];

/// Everything the core needs from a verified notarization proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedProof {
    /// The user identifier, parsed from the verifier's stdout (not from the proof JSON
    /// itself).
    pub uid: u64,
    /// The commitment hash the proof binds the secret to.
    pub commitment_hash: CommitmentHex,
    /// The encoding deltas table. Invariant: every entry must be equal.
    pub deltas: Vec<EncodingDelta>,
    /// The zero-encodings table. Invariant: its length must equal `8 * input_bytes`.
    pub zero_encodings: Vec<Vec<u8>>,
    /// The number of input bytes the proof covers.
    pub input_bytes: usize,
}

/// The proof violated one of the core's structural invariants.
#[derive(Debug, thiserror::Error)]
pub enum ProofInvariantError {
    /// The encoding deltas were not all equal.
    #[error("encoding deltas are not all equal ({0} distinct values)")]
    DeltasNotEqual(usize),
    /// There were no deltas to check at all.
    #[error("proof carries no encoding deltas")]
    NoDeltas,
    /// The zero-encodings count did not match `8 * input_bytes`.
    #[error("expected {expected} zero-encodings for {input_bytes} input bytes, got {got}")]
    ZeroEncodingCountMismatch {
        /// The expected count.
        expected: usize,
        /// The input byte count the mismatch was computed against.
        input_bytes: usize,
        /// The actual count found in the proof.
        got: usize,
    },
}

impl VerifiedProof {
    /// Checks the two structural invariants a verified proof must satisfy: all
    /// 16-byte deltas are equal, and there are exactly 8 zero-encodings per input
    /// byte.
    pub fn check_invariants(&self) -> Result<(), ProofInvariantError> {
        let first = self.deltas.first().ok_or(ProofInvariantError::NoDeltas)?;
        let distinct = self.deltas.iter().filter(|d| *d != first).count() + 1;
        if distinct != 1 {
            return Err(ProofInvariantError::DeltasNotEqual(distinct));
        }
        let expected = 8 * self.input_bytes;
        if self.zero_encodings.len() != expected {
            return Err(ProofInvariantError::ZeroEncodingCountMismatch {
                expected,
                input_bytes: self.input_bytes,
                got: self.zero_encodings.len(),
            });
        }
        Ok(())
    }
}
