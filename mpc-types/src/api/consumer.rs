//! Response body for the read-only consumer statistics endpoint.

use serde::{Deserialize, Serialize};

/// Response to `GET /query-computation`.
///
/// Served from the coordinator's `ConsumerCache`; callers receive a 503 instead of
/// this body while the cache has not populated yet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryComputationStatsResponse {
    /// The number of data providers the statistics were computed over.
    pub num_data_providers: u64,
    /// The maximum contributed value.
    pub max: f64,
    /// The mean contributed value.
    pub mean: f64,
    /// The median contributed value.
    pub median: f64,
    /// The Gini coefficient of the contributed values.
    pub gini_coefficient: f64,
}
