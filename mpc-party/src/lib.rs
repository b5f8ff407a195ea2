#![deny(missing_docs)]
//! A single computation party in the MPC coordination cluster.
//!
//! The entry point is [`PartyServiceBuilder`]. It wires an external proof verifier,
//! program compiler, program runner, and certificate rehasher into a
//! [`services::party_engine::PartyEngine`] and exposes the admin-only HTTP API the
//! coordinator drives. Implementations supply the four capability collaborators so
//! that production binaries point at real subprocess-backed implementations while
//! tests point at in-memory fakes.
//!
//! ```ignore
//! let router = PartyServiceBuilder::init(config, verifier, compiler, runner, rehasher, started);
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;

use axum::Router;
use mpc_engine::cert_rehash::CertRehasherService;
use mpc_engine::program::{ProgramCompiler, ProgramRunner};
use mpc_engine::proof_verifier::ProofVerifierService;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod metrics;
pub(crate) mod api;
pub mod services;

pub use nodes_common::StartedServices;

use config::PartyConfig;
use services::party_engine::PartyEngine;

/// Builds the HTTP router for a party node.
pub struct PartyServiceBuilder;

impl PartyServiceBuilder {
    /// Assembles the party's router from its config and external capability
    /// collaborators.
    pub fn init(
        config: &PartyConfig,
        proof_verifier: ProofVerifierService,
        compiler: Arc<dyn ProgramCompiler + Send + Sync>,
        runner: Arc<dyn ProgramRunner + Send + Sync>,
        rehasher: CertRehasherService,
        started_services: StartedServices,
    ) -> Router {
        metrics::describe_metrics();
        let engine = Arc::new(PartyEngine::new(
            config,
            proof_verifier,
            compiler,
            runner,
            rehasher,
        ));

        Router::new()
            .merge(api::health::routes(started_services))
            .merge(api::admin::routes(engine, config.api_key.clone()))
            .layer(TraceLayer::new_for_http())
    }
}
