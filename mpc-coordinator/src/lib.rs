#![deny(missing_docs)]
//! The public-facing coordinator of the MPC coordination cluster.
//!
//! The entry point is [`CoordinatorServiceBuilder`]. It wires a durable session store
//! and an external proof verifier into a [`services::coordinator::Coordinator`], starts
//! the [`services::consumer_cache::ConsumerCache`] refresher, and exposes the queue,
//! sharing, and consumer HTTP surfaces described in the coordinator's external
//! interface.
//!
//! ```ignore
//! let router = CoordinatorServiceBuilder::init(&config, verifier, started).await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;

use axum::Router;
use eyre::Context as _;
use mpc_engine::proof_verifier::ProofVerifierService;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod metrics;
pub(crate) mod api;
pub mod services;

pub use nodes_common::StartedServices;

use config::CoordinatorConfig;
use services::consumer_cache::ConsumerCache;
use services::coordinator::Coordinator;
use services::session_store::postgres::PostgresSessionStore;
use services::voucher_store::InMemoryVoucherStore;

/// Builds the HTTP router for the coordinator node.
pub struct CoordinatorServiceBuilder;

impl CoordinatorServiceBuilder {
    /// Assembles the coordinator's router from its config and external proof verifier.
    ///
    /// Connects the session store's Postgres pool, runs its embedded migrations, builds
    /// the [`Coordinator`], and starts the consumer statistics cache. The returned
    /// router merges the health, queue-admission, sharing/query, and consumer-facing
    /// endpoints behind one `TraceLayer`.
    pub async fn init(
        config: &CoordinatorConfig,
        proof_verifier: ProofVerifierService,
        started_services: StartedServices,
    ) -> eyre::Result<Router> {
        metrics::describe_metrics();

        let session_store = PostgresSessionStore::init(
            &config.db_connection_string,
            &config.db_schema,
            config.max_db_connections,
            config.prohibit_multiple_contributions,
        )
        .await
        .context("while initializing the session store")?;

        let voucher_store: Option<services::voucher_store::VoucherStoreService> =
            if config.require_voucher {
                Some(Arc::new(InMemoryVoucherStore::new(
                    config.voucher_codes.clone(),
                )))
            } else {
                None
            };

        let coordinator = Arc::new(Coordinator::new(
            config,
            Arc::new(session_store),
            proof_verifier,
            voucher_store,
        ));

        let cache = ConsumerCache::new(
            Arc::clone(&coordinator),
            config.cache_ttl_seconds,
            "coordinator-consumer-cache".to_string(),
        );

        Ok(Router::new()
            .merge(api::health::routes(started_services))
            .merge(api::queue::routes(Arc::clone(&coordinator)))
            .merge(api::sharing::routes(coordinator))
            .merge(api::consumer::routes(cache))
            .layer(TraceLayer::new_for_http()))
    }
}
