//! Durable, append-only storage for accepted sharing sessions.
//!
//! Implementations must provide a durable linearizable append with `id` assigned
//! strictly increasing starting at 1, and must enforce `uid` uniqueness when the
//! coordinator is configured with `prohibit_multiple_contributions`.

use std::sync::Arc;

use async_trait::async_trait;
use mpc_types::session::SessionRecord;

pub mod postgres;

/// Dynamic trait object for the session store, shared across the coordinator.
pub type SessionStoreService = Arc<dyn SessionStore + Send + Sync>;

/// Durable record of accepted sharing sessions.
#[async_trait]
pub trait SessionStore {
    /// Total number of persisted sessions.
    async fn count(&self) -> eyre::Result<u64>;

    /// Persists `record`, assigning it the next monotonic `id`.
    ///
    /// Returns [`InsertSessionError::DuplicateUid`] if `uid` uniqueness is enforced and
    /// already violated.
    async fn insert(
        &self,
        eth_address: &str,
        uid: u64,
        proof_path: &str,
    ) -> Result<SessionRecord, InsertSessionError>;

    /// True iff some persisted session carries this `uid`.
    async fn exists_uid(&self, uid: u64) -> eyre::Result<bool>;

    /// True iff some persisted session carries this `eth_address`. Backs
    /// `has_address_shared_data`.
    async fn exists_eth_address(&self, eth_address: &str) -> eyre::Result<bool>;
}

/// Error inserting a [`SessionRecord`].
#[derive(Debug, thiserror::Error)]
pub enum InsertSessionError {
    /// `uid` uniqueness is enforced and a session with this `uid` already exists.
    #[error("uid {0} has already contributed data")]
    DuplicateUid(u64),
    /// Any other storage failure.
    #[error(transparent)]
    Other(#[from] eyre::Error),
}
