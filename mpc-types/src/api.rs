//! Versioned HTTP request/response DTOs.
//!
//! Grouped by which surface they are served on: [`coordinator`] for the public-facing
//! queue/sharing API, [`party`] for the admin-only per-party API, and [`consumer`] for
//! the read-only statistics endpoint.

pub mod consumer;
pub mod coordinator;
pub mod party;
