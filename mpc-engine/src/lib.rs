#![deny(missing_docs)]
//! Pure and subprocess-backed building blocks shared by the coordinator and party
//! services.
//!
//! Everything in this crate is a capability a party or coordinator depends on rather
//! than implements inline, so that tests can swap in a fake without touching the
//! services that use it:
//!
//! * [`port_allocator`] — pure port-window allocation, no I/O.
//! * [`proof_verifier`] — the external notarization proof verifier.
//! * [`program`] — MPC program templates, the external compiler, and the external VM.
//! * [`cert_rehash`] — the external player-data certificate hash-index rebuilder.

pub mod cert_rehash;
pub mod port_allocator;
pub mod program;
pub mod proof_verifier;

pub use cert_rehash::{CertRehasher, CertRehashError, CertRehasherService};
pub use port_allocator::PortAllocator;
pub use proof_verifier::{ProofVerifier, ProofVerifierError, ProofVerifierService};
