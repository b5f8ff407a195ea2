//! Configuration for the coordinator binary.
//!
//! Can be configured via environment variables or command line arguments using `clap`,
//! the same way a party node is.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use secrecy::SecretString;

/// Whether the coordinator dials parties over plain HTTP or HTTPS.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PartyWebProtocol {
    /// Plain HTTP. Suitable for a trusted network or local development.
    Http,
    /// HTTPS. The parties' certificates must be trusted by the coordinator's client.
    Https,
}

impl std::fmt::Display for PartyWebProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PartyWebProtocol::Http => "http",
            PartyWebProtocol::Https => "https",
        })
    }
}

/// The configuration for a `mpc-coordinator` node.
#[derive(Parser, Debug)]
pub struct CoordinatorConfig {
    /// The bind address of the Axum server.
    #[clap(long, env = "COORDINATOR_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// The number of computation parties in the cluster.
    #[clap(long, env = "NUM_PARTIES")]
    pub num_parties: u16,

    /// The hosts of every party, in party-id order.
    #[clap(long, env = "PARTY_HOSTS", value_delimiter = ',')]
    pub party_hosts: Vec<String>,

    /// The admin API port of every party, in party-id order.
    #[clap(long, env = "PARTY_PORTS", value_delimiter = ',')]
    pub party_ports: Vec<u16>,

    /// Whether to dial parties over `http` or `https`.
    #[clap(long, env = "PARTY_WEB_PROTOCOL", default_value = "http")]
    pub party_web_protocol: PartyWebProtocol,

    /// The shared API key presented to every party's admin API.
    #[clap(long, env = "PARTY_API_KEY")]
    pub party_api_key: SecretString,

    /// First port of the MPC port range allocated across all parties.
    #[clap(long, env = "FREE_PORTS_START")]
    pub free_ports_start: u16,

    /// Last port (inclusive) of the MPC port range.
    #[clap(long, env = "FREE_PORTS_END")]
    pub free_ports_end: u16,

    /// Maximum number of entries the user queue admits at once.
    #[clap(long, env = "USER_QUEUE_SIZE", default_value = "1000")]
    pub user_queue_size: usize,

    /// How long a queue head may hold its `computation_key` before being evicted.
    #[clap(
        long,
        env = "USER_QUEUE_HEAD_TIMEOUT",
        default_value = "5min",
        value_parser = humantime::parse_duration,
    )]
    pub user_queue_head_timeout: Duration,

    /// If set, a second contribution from the same `uid` is rejected.
    #[clap(long, env = "PROHIBIT_MULTIPLE_CONTRIBUTIONS", default_value = "true")]
    pub prohibit_multiple_contributions: bool,

    /// If set, a sharing session's commitment hex is cross-checked against the
    /// notarization proof's own commitment hash.
    #[clap(long, env = "PERFORM_COMMITMENT_CHECK", default_value = "true")]
    pub perform_commitment_check: bool,

    /// How often the consumer statistics cache refreshes.
    #[clap(
        long,
        env = "CACHE_TTL_SECONDS",
        default_value = "60s",
        value_parser = humantime::parse_duration,
    )]
    pub cache_ttl_seconds: Duration,

    /// The maximum number of data providers a sharing session may reference.
    #[clap(long, env = "MAX_DATA_PROVIDERS", default_value = "1000000")]
    pub max_data_providers: u64,

    /// Client ids at or beyond this value are rejected.
    #[clap(long, env = "MAX_CLIENT_ID", default_value = "1000000")]
    pub max_client_id: u32,

    /// Bound on the total time a fanout to all parties may take before the session
    /// aborts.
    #[clap(
        long,
        env = "FANOUT_TIMEOUT",
        default_value = "2min",
        value_parser = humantime::parse_duration,
    )]
    pub fanout_timeout: Duration,

    /// Path to the external notarization proof verifier binary.
    #[clap(long, env = "COORDINATOR_VERIFIER_BIN")]
    pub verifier_bin: PathBuf,

    /// Directory accepted notarization proofs are persisted under.
    #[clap(long, env = "COORDINATOR_PROOFS_DIR", default_value = "./tlsn_proofs")]
    pub proofs_dir: PathBuf,

    /// The Postgres connection string for the session store.
    #[clap(long, env = "COORDINATOR_DB_CONNECTION_STRING")]
    pub db_connection_string: SecretString,

    /// The Postgres schema the session store uses.
    #[clap(long, env = "COORDINATOR_DB_SCHEMA")]
    pub db_schema: String,

    /// Max connections in the session store's Postgres pool.
    #[clap(long, env = "COORDINATOR_MAX_DB_CONNECTIONS", default_value = "4")]
    pub max_db_connections: u32,

    /// If set, queue admission additionally requires a one-time voucher code to have
    /// been redeemed for the caller's `access_key` beforehand.
    #[clap(long, env = "REQUIRE_VOUCHER", default_value = "false")]
    pub require_voucher: bool,

    /// The valid one-time voucher codes, consulted only when `require_voucher` is set.
    #[clap(long, env = "VOUCHER_CODES", value_delimiter = ',', default_value = "")]
    pub voucher_codes: Vec<String>,

    /// Max wait time the service waits for its workers during shutdown.
    #[clap(
        long,
        env = "COORDINATOR_MAX_WAIT_TIME_SHUTDOWN",
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub max_wait_time_shutdown: Duration,
}

impl CoordinatorConfig {
    /// The base URL the coordinator dials a party's admin API at.
    pub fn party_base_url(&self, index: usize) -> String {
        format!(
            "{}://{}:{}",
            self.party_web_protocol, self.party_hosts[index], self.party_ports[index]
        )
    }
}
