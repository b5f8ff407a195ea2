//! Coordinator binary wiring `mpc-coordinator` to a subprocess-backed notarization
//! proof verifier.
//!
//! This is the example instantiation of the coordinator: it reads its configuration
//! from the environment/command line, connects the session store, and starts the
//! Axum server with graceful shutdown.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use eyre::Context as _;
use mpc_coordinator::{CoordinatorServiceBuilder, StartedServices, config::CoordinatorConfig};
use mpc_engine::proof_verifier::SubprocessProofVerifier;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("can install");
    let tracing_config = nodes_observability::TracingConfig::try_from_env()?;
    let _tracing_handle = nodes_observability::initialize_tracing(&tracing_config)?;

    tracing::info!("{}", nodes_common::version_info!());

    let config = CoordinatorConfig::parse();
    tracing::info!("starting mpc-coordinator with config: {config:#?}");

    let proof_verifier = Arc::new(SubprocessProofVerifier::new(config.verifier_bin.clone()));

    let (cancellation_token, is_graceful_shutdown) =
        nodes_common::spawn_shutdown_task(nodes_common::default_shutdown_signal());

    let bind_addr = config.bind_addr;
    let max_wait_time_shutdown = config.max_wait_time_shutdown;

    let router = CoordinatorServiceBuilder::init(&config, proof_verifier, StartedServices::new())
        .await
        .context("while initiating coordinator service")?;

    tracing::info!("binding to {}", bind_addr);
    let tcp_listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("while binding tcp-listener")?;

    let axum_cancel_token = cancellation_token.clone();
    let server = tokio::spawn(async move {
        tracing::info!(
            "starting axum server on {}",
            tcp_listener
                .local_addr()
                .map(|x| x.to_string())
                .unwrap_or(String::from("invalid addr"))
        );
        let axum_shutdown_signal = axum_cancel_token.clone();
        let axum_result = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move { axum_shutdown_signal.cancelled().await })
            .await;
        tracing::info!("axum server shutdown");
        if let Err(err) = axum_result {
            tracing::error!("got error from axum: {err:?}");
        }
        axum_cancel_token.cancel();
    });

    tracing::info!("everything started successfully - now waiting for shutdown...");
    cancellation_token.cancelled().await;

    tracing::info!("waiting for shutdown of services (max wait time {max_wait_time_shutdown:?})..");

    match tokio::time::timeout(max_wait_time_shutdown, server).await {
        Ok(_) => tracing::info!("successfully finished shutdown in time"),
        Err(_) => {
            is_graceful_shutdown.store(false, Ordering::Relaxed);
            tracing::warn!("could not finish shutdown in time")
        }
    }

    tracing::info!("good night!");
    if is_graceful_shutdown.load(Ordering::Relaxed) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
