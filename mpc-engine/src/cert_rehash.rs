//! Rehashing the player-data directory's certificate symlink index.
//!
//! The MPC VM locates peer/client certificates in `Player-Data/` by OpenSSL-style
//! hash symlink, not by filename; after the directory's certificate set changes, the
//! hash index must be rebuilt by an external rehash command before the VM runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Dynamic trait object for a cert-hash rehasher.
pub type CertRehasherService = std::sync::Arc<dyn CertRehasher + Send + Sync>;

/// Everything that can go wrong rehashing a player-data directory.
#[derive(Debug, thiserror::Error)]
pub enum CertRehashError {
    /// The rehash command exited non-zero.
    #[error("cert rehash failed: {0}")]
    Failed(String),
    /// The rehash command could not be invoked.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rebuilds a player-data directory's certificate hash index.
#[async_trait]
pub trait CertRehasher {
    /// Rehashes every certificate under `player_data_dir`.
    async fn rehash(&self, player_data_dir: &Path) -> Result<(), CertRehashError>;
}

/// Rehashes by invoking an external rehash binary with the player-data directory as
/// its sole argument (mirrors the `c_rehash` convention of pointing a hash-index
/// rebuilder at a certificate directory).
pub struct SubprocessCertRehasher {
    binary_path: PathBuf,
}

impl SubprocessCertRehasher {
    /// Creates a rehasher that invokes the binary at `binary_path`.
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[async_trait]
impl CertRehasher for SubprocessCertRehasher {
    async fn rehash(&self, player_data_dir: &Path) -> Result<(), CertRehashError> {
        let output = Command::new(&self.binary_path)
            .arg(player_data_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(CertRehashError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}
