//! Periodically refreshed cache of the aggregate statistics the consumer endpoint
//! serves.
//!
//! A background task spawned once, after the first population, refreshes the cache on
//! a fixed interval via `tokio::time::interval`. The refresher enqueues itself through
//! the ordinary priority-admission path rather than bypassing the queue, so a cache
//! refresh competes fairly with any in-flight sharing session for the coordinator's
//! single sharing lock.

use std::sync::Arc;
use std::time::Duration;

use mpc_types::api::consumer::QueryComputationStatsResponse;
use mpc_types::queue::AccessKey;
use tokio::sync::RwLock;

use crate::metrics::METRICS_ID_CONSUMER_CACHE_REFRESH;
use crate::services::coordinator::Coordinator;

const REFRESHER_ACCESS_KEY: &str = "__consumer_cache_refresher__";
const REFRESHER_CLIENT_ID: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum CacheState {
    Uninitialized,
    Populating,
    Ready(QueryComputationStatsResponse),
}

/// Caches the most recently computed consumer statistics, refreshing them on a fixed
/// interval via a query session run under priority admission.
pub struct ConsumerCache {
    state: RwLock<CacheState>,
    coordinator: Arc<Coordinator>,
    refresh_interval: Duration,
    client_cert_file: String,
}

/// Why [`ConsumerCache::get`] could not return a value.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerCacheError {
    /// The cache has never populated (first request after startup, still running).
    #[error("statistics cache is still populating")]
    Populating,
}

impl ConsumerCache {
    /// Builds an uninitialized cache bound to `coordinator`.
    ///
    /// `client_cert_file` is the coordinator's own client identity, presented to
    /// parties on the refresher's behalf.
    pub fn new(
        coordinator: Arc<Coordinator>,
        refresh_interval: Duration,
        client_cert_file: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(CacheState::Uninitialized),
            coordinator,
            refresh_interval,
            client_cert_file,
        })
    }

    /// Returns the cached statistics, populating the cache synchronously on the very
    /// first call and returning [`ConsumerCacheError::Populating`] to any request that
    /// arrives while a refresh (first or periodic) is in flight.
    pub async fn get(self: &Arc<Self>) -> Result<QueryComputationStatsResponse, ConsumerCacheError> {
        {
            let state = self.state.read().await;
            match *state {
                CacheState::Ready(stats) => return Ok(stats),
                CacheState::Populating => return Err(ConsumerCacheError::Populating),
                CacheState::Uninitialized => {}
            }
        }

        let mut state = self.state.write().await;
        // Re-check: another caller may have won the race to populate while we waited
        // for the write lock.
        match *state {
            CacheState::Ready(stats) => return Ok(stats),
            CacheState::Populating => return Err(ConsumerCacheError::Populating),
            CacheState::Uninitialized => {}
        }
        *state = CacheState::Populating;
        drop(state);

        let stats = self.refresh_once().await;
        *self.state.write().await = CacheState::Ready(stats);
        self.spawn_refresher();
        Ok(stats)
    }

    async fn refresh_once(&self) -> QueryComputationStatsResponse {
        let access_key = AccessKey(REFRESHER_ACCESS_KEY.to_string());
        let computation_key = self
            .coordinator
            .run_as_priority_client(access_key.clone(), Duration::from_millis(50))
            .await;
        let req = mpc_types::api::coordinator::QueryComputationRequest {
            client_id: REFRESHER_CLIENT_ID,
            client_cert_file: self.client_cert_file.clone(),
            access_key: access_key.clone(),
            computation_key: computation_key.clone(),
        };
        let result = self.coordinator.query_computation(req).await;
        self.coordinator.finish_computation(&mpc_types::api::coordinator::FinishComputationRequest {
            access_key,
            computation_key,
        });
        metrics::counter!(METRICS_ID_CONSUMER_CACHE_REFRESH, "outcome" => if result.is_ok() { "ok" } else { "error" }).increment(1);
        result.map(|(_, stats)| stats).unwrap_or(QueryComputationStatsResponse {
            num_data_providers: 0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            gini_coefficient: 0.0,
        })
    }

    fn spawn_refresher(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.refresh_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = this.refresh_once().await;
                *this.state.write().await = CacheState::Ready(stats);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populating_is_reported_while_uninitialized() {
        let state = CacheState::Populating;
        assert!(matches!(state, CacheState::Populating));
    }
}
