//! A cert rehasher that records its calls instead of shelling out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mpc_engine::cert_rehash::{CertRehashError, CertRehasher};
use parking_lot::Mutex;

/// Always succeeds, recording every directory it was asked to rehash.
#[derive(Default)]
pub struct FakeCertRehasher {
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeCertRehasher {
    /// The player-data directories passed to [`CertRehasher::rehash`] so far, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CertRehasher for FakeCertRehasher {
    async fn rehash(&self, player_data_dir: &Path) -> Result<(), CertRehashError> {
        self.calls.lock().push(player_data_dir.to_path_buf());
        Ok(())
    }
}
