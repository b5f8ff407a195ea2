//! Persistent session bookkeeping types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The id of one computation party in the cluster, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub usize);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for PartyId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(PartyId)
    }
}

/// The monotonically increasing id of a persisted [`SessionRecord`]. Starts at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A completed sharing session, as appended to the coordinator's session store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The monotonic id of the session.
    pub id: SessionId,
    /// The Ethereum address that contributed the secret.
    pub eth_address: String,
    /// The uid parsed from the notarization proof's verifier output.
    pub uid: u64,
    /// The path the accepted proof JSON was persisted to.
    pub proof_path: String,
}
