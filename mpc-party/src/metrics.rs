//! Metrics definitions for a party node.

/// Counts successful `request_sharing_data_mpc` runs.
pub const METRICS_ID_PARTY_SHARING_SUCCESS: &str = "mpc.party.sharing.success";
/// Counts `request_sharing_data_mpc` runs that rolled back the share file.
pub const METRICS_ID_PARTY_SHARING_ROLLBACK: &str = "mpc.party.sharing.rollback";
/// Counts successful `request_querying_computation_mpc` runs.
pub const METRICS_ID_PARTY_QUERY_SUCCESS: &str = "mpc.party.query.success";
/// Duration of a sharing program compile + run.
pub const METRICS_ID_PARTY_SHARING_DURATION: &str = "mpc.party.sharing.duration";
/// Duration of a query program compile + run.
pub const METRICS_ID_PARTY_QUERY_DURATION: &str = "mpc.party.query.duration";

/// Describes every metric this crate emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_PARTY_SHARING_SUCCESS,
        metrics::Unit::Count,
        "Number of successful sharing MPC runs"
    );
    metrics::describe_counter!(
        METRICS_ID_PARTY_SHARING_ROLLBACK,
        metrics::Unit::Count,
        "Number of sharing MPC runs that rolled back the share file"
    );
    metrics::describe_counter!(
        METRICS_ID_PARTY_QUERY_SUCCESS,
        metrics::Unit::Count,
        "Number of successful query MPC runs"
    );
    metrics::describe_histogram!(
        METRICS_ID_PARTY_SHARING_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a sharing MPC compile + run"
    );
    metrics::describe_histogram!(
        METRICS_ID_PARTY_QUERY_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a query MPC compile + run"
    );
}
