//! A proof verifier that returns a canned [`VerifiedProof`] or a canned rejection.

use async_trait::async_trait;
use mpc_engine::proof_verifier::{ProofVerifier, ProofVerifierError};
use mpc_types::proof::VerifiedProof;
use parking_lot::Mutex;

/// A proof verifier that always returns the same verdict, configured up front.
///
/// Tests construct one with [`FakeProofVerifier::accepting`] or
/// [`FakeProofVerifier::rejecting`] and hand it to the service under test as a
/// `ProofVerifierService`.
pub struct FakeProofVerifier {
    verdict: Mutex<Result<VerifiedProof, String>>,
}

impl FakeProofVerifier {
    /// Builds a verifier that always accepts with `verified`.
    pub fn accepting(verified: VerifiedProof) -> Self {
        Self {
            verdict: Mutex::new(Ok(verified)),
        }
    }

    /// Builds a verifier that always rejects with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            verdict: Mutex::new(Err(reason.into())),
        }
    }
}

#[async_trait]
impl ProofVerifier for FakeProofVerifier {
    async fn verify(&self, _proof: &str) -> Result<VerifiedProof, ProofVerifierError> {
        match &*self.verdict.lock() {
            Ok(verified) => Ok(verified.clone()),
            Err(reason) => Err(ProofVerifierError::Rejected(reason.clone())),
        }
    }
}
