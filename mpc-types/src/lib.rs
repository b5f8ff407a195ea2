#![deny(missing_docs)]
//! Shared type definitions for the MPC coordination cluster.
//!
//! This crate groups together the strongly-typed values and wire messages exchanged
//! between a `mpc-coordinator` instance, its `mpc-party` nodes, and their clients. It
//! provides:
//!
//! * Thin wrappers around the queue/session identifiers (see [`queue`] and [`session`]).
//! * The port-window type shared by the coordinator and the port allocator (see [`ports`]).
//! * The notarization-proof result type shared between the coordinator and every party
//!   (see [`proof`]).
//! * Versioned HTTP request/response DTOs for client, party, and consumer traffic (see
//!   [`api`]).
//! * The named HTTP-status error taxonomy of the system (see [`error_codes`]).

pub mod api;
pub mod error_codes;
pub mod ports;
pub mod proof;
pub mod queue;
pub mod session;

pub use ports::PortPair;
pub use proof::{ProofBlob, VerifiedProof};
pub use queue::{AccessKey, AddUserResult, ComputationKey, QueuePosition};
pub use session::{PartyId, SessionId, SessionRecord};
