//! Party binary wiring `mpc-party` to subprocess-backed MPC tooling: the compiler,
//! the VM, and the notarization proof verifier are all external binaries invoked as
//! child processes.

mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use eyre::Context as _;
use mpc_engine::cert_rehash::SubprocessCertRehasher;
use mpc_engine::program::{SubprocessProgramCompiler, SubprocessProgramRunner};
use mpc_engine::proof_verifier::SubprocessProofVerifier;
use mpc_party::{PartyServiceBuilder, StartedServices};

use crate::config::ExamplePartyConfig;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("can install");
    let tracing_config = nodes_observability::TracingConfig::try_from_env()?;
    let _tracing_handle = nodes_observability::initialize_tracing(&tracing_config)?;

    tracing::info!("{}", nodes_common::version_info!());

    let config = ExamplePartyConfig::parse();
    tracing::info!("starting mpc-party with config: {config:#?}");

    let proof_verifier = Arc::new(SubprocessProofVerifier::new(
        config.party.verifier_bin.clone(),
    ));
    let compiler = Arc::new(SubprocessProgramCompiler::new(
        config.party.compiler_bin.clone(),
    ));
    let runner = Arc::new(SubprocessProgramRunner::new(config.party.vm_bin.clone()));
    let rehasher = Arc::new(SubprocessCertRehasher::new(config.party.rehash_bin.clone()));

    let (cancellation_token, is_graceful_shutdown) =
        nodes_common::spawn_shutdown_task(nodes_common::default_shutdown_signal());

    let bind_addr = config.bind_addr;
    let max_wait_time_shutdown = config.max_wait_time_shutdown;

    let router = PartyServiceBuilder::init(
        &config.party,
        proof_verifier,
        compiler,
        runner,
        rehasher,
        StartedServices::new(),
    );

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
