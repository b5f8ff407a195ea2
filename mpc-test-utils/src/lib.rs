#![deny(missing_docs)]
//! Fakes standing in for the coordination cluster's external collaborators in tests:
//! the notarization proof verifier, the MPC compiler and VM, and the party HTTP
//! surface the coordinator fans out to.
//!
//! Subprocess calls are the one place the cluster can't run in-process during a test,
//! so every capability trait gets a fake here instead of a mock framework: fakes are
//! cheap to construct, carry no expectations to verify, and behave like a
//! well-behaved real implementation would.

pub mod fake_cert_rehasher;
pub mod fake_compiler;
pub mod fake_proof_verifier;
pub mod fake_runner;

pub use fake_cert_rehasher::FakeCertRehasher;
pub use fake_compiler::FakeProgramCompiler;
pub use fake_proof_verifier::FakeProofVerifier;
pub use fake_runner::FakeProgramRunner;
