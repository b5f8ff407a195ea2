//! The notarization proof verifier.
//!
//! The verifier itself is an external program: a TLSNotary proof is opaque to
//! everything in this crate except the subprocess it shells out to. This module only
//! defines the capability interface and the invariant checks layered on top of its
//! output.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use mpc_types::proof::{CommitmentHex, ProofInvariantError, VerifiedProof};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Dynamic trait object for a proof verifier.
pub type ProofVerifierService = std::sync::Arc<dyn ProofVerifier + Send + Sync>;

/// Everything that can go wrong while verifying a notarization proof.
#[derive(Debug, thiserror::Error)]
pub enum ProofVerifierError {
    /// The verifier rejected the proof; the message is the verifier's own explanation.
    #[error("proof rejected: {0}")]
    Rejected(String),
    /// The verifier could not be invoked, or its output could not be parsed.
    #[error("could not run proof verifier: {0}")]
    Io(#[from] std::io::Error),
    /// The verifier accepted the proof but its output violated the core's structural
    /// invariants.
    #[error(transparent)]
    Invariant(#[from] ProofInvariantError),
}

/// Verifies notarization proofs and extracts the data a sharing session needs from
/// them.
#[async_trait]
pub trait ProofVerifier {
    /// Verifies `proof` and, on success, returns the data extracted from it.
    ///
    /// Returns `Err` for both "the verifier rejected the proof" and "the verifier
    /// could not be run" — callers that need to distinguish these map
    /// [`ProofVerifierError::Rejected`] to a 400 and everything else to a 500.
    async fn verify(&self, proof: &str) -> Result<VerifiedProof, ProofVerifierError>;
}

/// Verifies proofs by shelling out to an external verifier binary.
///
/// The proof is written to the binary's stdin; on success the binary prints the
/// parsed proof fields as JSON on stdout and the user id on its last line.
pub struct SubprocessProofVerifier {
    binary_path: PathBuf,
}

impl SubprocessProofVerifier {
    /// Creates a verifier that invokes the binary at `binary_path`.
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[async_trait]
impl ProofVerifier for SubprocessProofVerifier {
    async fn verify(&self, proof: &str) -> Result<VerifiedProof, ProofVerifierError> {
        let mut child = Command::new(&self.binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin.write_all(proof.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProofVerifierError::Rejected(message));
        }

        let verified = parse_verifier_output(&output.stdout)
            .map_err(|e| ProofVerifierError::Io(std::io::Error::other(e)))?;
        verified.check_invariants()?;
        Ok(verified)
    }
}

/// Parses the verifier's stdout: a JSON document with `commitment_hash`, `deltas`, and
/// `zero_encodings`, followed by a final line carrying the numeric `uid`.
fn parse_verifier_output(stdout: &[u8]) -> Result<VerifiedProof, String> {
    let text = String::from_utf8_lossy(stdout);
    let (json_part, uid_line) = text
        .trim_end()
        .rsplit_once('\n')
        .ok_or_else(|| "verifier produced no uid line".to_string())?;

    let uid: u64 = uid_line
        .trim()
        .parse()
        .map_err(|e| format!("could not parse uid: {e}"))?;

    #[derive(serde::Deserialize)]
    struct RawProof {
        commitment_hash: String,
        deltas: Vec<[u8; 16]>,
        zero_encodings: Vec<Vec<u8>>,
        input_bytes: usize,
    }

    let raw: RawProof =
        serde_json::from_str(json_part).map_err(|e| format!("malformed proof json: {e}"))?;

    Ok(VerifiedProof {
        uid,
        commitment_hash: CommitmentHex(raw.commitment_hash),
        deltas: raw.deltas,
        zero_encodings: raw.zero_encodings,
        input_bytes: raw.input_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verifier_output() {
        let stdout = br#"{"commitment_hash":"ab12","deltas":[],"zero_encodings":[],"input_bytes":0}
42
"#;
        let parsed = parse_verifier_output(stdout).unwrap();
        assert_eq!(parsed.uid, 42);
        assert_eq!(parsed.commitment_hash.0, "ab12");
    }

    #[test]
    fn rejects_output_without_uid_line() {
        let stdout = br#"{"commitment_hash":"ab12","deltas":[],"zero_encodings":[],"input_bytes":0}"#;
        assert!(parse_verifier_output(stdout).is_err());
    }
}
