//! Binary-level configuration for the example party node.
//!
//! [`mpc_party::config::PartyConfig`] only covers the library's own concerns; the
//! bind address and shutdown timeout are specific to how this binary serves it, so
//! they live here and the library config is flattened in via `#[clap(flatten)]`.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use mpc_party::config::PartyConfig;

/// The configuration for the `mpc-party-example` binary.
#[derive(Parser, Debug)]
pub struct ExamplePartyConfig {
    /// The bind address of the Axum server.
    #[clap(long, env = "PARTY_BIND_ADDR", default_value = "0.0.0.0:8081")]
    pub bind_addr: SocketAddr,

    /// Max wait time the service waits for its workers during shutdown.
    #[clap(
        long,
        env = "PARTY_MAX_WAIT_TIME_SHUTDOWN",
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub max_wait_time_shutdown: Duration,

    /// The party engine's own configuration.
    #[clap(flatten)]
    pub party: PartyConfig,
}
