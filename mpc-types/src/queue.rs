//! Types used by the single-admission user queue.
//!
//! See `mpc_coordinator::services::user_queue` for the queue implementation itself;
//! this module only carries the wire-safe identifiers it hands out.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A client-chosen opaque handle referencing one queue entry.
///
/// Callers hold this for as long as they want to stay in line; it is never rotated by
/// the queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessKey(pub String);

impl fmt::Display for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A one-time token minted when an [`AccessKey`] becomes head of the queue.
///
/// Required for every party-facing operation during that head's turn. Not a
/// cryptographic secret, but treated like one: never logged, never reused across
/// head-promotions.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputationKey(pub String);

impl fmt::Debug for ComputationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputationKey(..)")
    }
}

/// The 0-based distance of an [`AccessKey`] from the head of the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueuePosition(pub usize);

/// The result of `add_user`/`add_priority_user`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddUserResult {
    /// The entry was admitted.
    Succeeded,
    /// The caller's `access_key` is already present in the queue.
    AlreadyInQueue,
    /// The queue is already at `max_size`.
    QueueIsFull,
    /// `require_voucher` is enabled and no voucher has been redeemed for this
    /// `access_key` yet.
    VoucherRequired,
}
