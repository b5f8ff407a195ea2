//! Metrics definitions for the coordinator.

/// Counts `add_user_to_queue`/`add_priority_user_to_queue` results by outcome.
pub const METRICS_ID_QUEUE_ADMISSIONS: &str = "mpc.coordinator.queue.admissions";
/// Counts head-of-queue timeout evictions.
pub const METRICS_ID_QUEUE_HEAD_EVICTIONS: &str = "mpc.coordinator.queue.head_evictions";
/// Counts sharing sessions by terminal state (persisted/aborted).
pub const METRICS_ID_SHARING_SESSIONS: &str = "mpc.coordinator.sharing.sessions";
/// Counts query sessions by terminal state.
pub const METRICS_ID_QUERY_SESSIONS: &str = "mpc.coordinator.query.sessions";
/// Duration of the fanout phase of a sharing session (verify through commitment check).
pub const METRICS_ID_SHARING_FANOUT_DURATION: &str = "mpc.coordinator.sharing.fanout_duration";
/// Duration of the fanout phase of a query session.
pub const METRICS_ID_QUERY_FANOUT_DURATION: &str = "mpc.coordinator.query.fanout_duration";
/// Counts consumer cache refreshes.
pub const METRICS_ID_CONSUMER_CACHE_REFRESH: &str = "mpc.coordinator.consumer_cache.refresh";

/// Describes every metric this crate emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_QUEUE_ADMISSIONS,
        metrics::Unit::Count,
        "Number of add_user/add_priority_user calls, labeled by result"
    );
    metrics::describe_counter!(
        METRICS_ID_QUEUE_HEAD_EVICTIONS,
        metrics::Unit::Count,
        "Number of head-of-queue entries evicted for exceeding the head timeout"
    );
    metrics::describe_counter!(
        METRICS_ID_SHARING_SESSIONS,
        metrics::Unit::Count,
        "Number of sharing sessions, labeled by terminal state"
    );
    metrics::describe_counter!(
        METRICS_ID_QUERY_SESSIONS,
        metrics::Unit::Count,
        "Number of query sessions, labeled by terminal state"
    );
    metrics::describe_histogram!(
        METRICS_ID_SHARING_FANOUT_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a sharing session's party fanout"
    );
    metrics::describe_histogram!(
        METRICS_ID_QUERY_FANOUT_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a query session's party fanout"
    );
    metrics::describe_counter!(
        METRICS_ID_CONSUMER_CACHE_REFRESH,
        metrics::Unit::Count,
        "Number of consumer cache refresh cycles"
    );
}
