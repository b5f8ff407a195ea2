//! Configuration for a single MPC party node.
//!
//! Can be configured via environment variables or command line arguments using
//! `clap`, the same way the coordinator is.

use std::path::PathBuf;

use clap::Parser;
use mpc_types::session::PartyId;
use secrecy::SecretString;

/// The configuration for a `mpc-party` node.
#[derive(Parser, Debug)]
pub struct PartyConfig {
    /// This party's id, 0-based.
    #[clap(long, env = "PARTY_ID")]
    pub party_id: PartyId,

    /// The shared API key admin callers must present in the `X-API-Key` header.
    #[clap(long, env = "PARTY_API_KEY")]
    pub api_key: SecretString,

    /// The maximum number of data providers a sharing session may reference.
    #[clap(long, env = "MAX_DATA_PROVIDERS", default_value = "1000000")]
    pub max_data_providers: u64,

    /// The fixed-point denominator the query program's revealed statistics are scaled
    /// by (e.g. the price precision of the contributed values).
    #[clap(long, env = "FIXED_POINT_SCALE", default_value = "100")]
    pub fixed_point_scale: u64,

    /// Root directory under which `Persistence/`, `Backup/`, `Player-Data/`, and
    /// `tlsn_proofs/` are created.
    #[clap(long, env = "PARTY_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Path to the external notarization proof verifier binary.
    #[clap(long, env = "PARTY_VERIFIER_BIN")]
    pub verifier_bin: PathBuf,

    /// Path to the external MPC program compiler binary.
    #[clap(long, env = "PARTY_COMPILER_BIN")]
    pub compiler_bin: PathBuf,

    /// Path to the external MPC VM binary.
    #[clap(long, env = "PARTY_VM_BIN")]
    pub vm_bin: PathBuf,

    /// Path to the external certificate hash-index rehash binary, invoked against
    /// `Player-Data/` after every client cert install.
    #[clap(long, env = "PARTY_REHASH_BIN")]
    pub rehash_bin: PathBuf,

    /// This party's host, as the other parties and the coordinator address it.
    #[clap(long, env = "PARTY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The hosts of every party in the cluster, in party-id order, including this one.
    ///
    /// Used to render the per-session IP descriptor file the MPC VM reads to find its
    /// peers.
    #[clap(long, env = "PARTY_PEER_HOSTS", value_delimiter = ',')]
    pub peer_hosts: Vec<String>,
}
