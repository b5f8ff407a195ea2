//! Optional one-time voucher redemption, gated behind `CoordinatorConfig::require_voucher`.
//!
//! The original system gated queue admission behind a voucher code redeemed for a
//! stable identity, independent of the `access_key` used for queue bookkeeping. Here
//! that becomes an explicit two-step flow: a voucher code is redeemed once *for* an
//! `access_key`, and `Coordinator::add_user`/`add_priority_user` then refuse to admit
//! that `access_key` until a redemption is on record for it. Off by default; when
//! `require_voucher` is unset, queue admission requires nothing beyond a pre-issued
//! access key and this store is never consulted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Dynamic trait object for the voucher store.
pub type VoucherStoreService = Arc<dyn VoucherStore + Send + Sync>;

/// Tracks which one-time voucher codes have been redeemed, and for which
/// `access_key` each redemption was made.
#[async_trait]
pub trait VoucherStore {
    /// Redeems `code` for `access_key`, returning `true` on first redemption and
    /// `false` if `code` was already redeemed (or never issued).
    async fn redeem(&self, code: &str, access_key: &str) -> eyre::Result<bool>;

    /// Whether some voucher code has already been redeemed for `access_key`.
    async fn is_redeemed(&self, access_key: &str) -> eyre::Result<bool>;
}

/// In-memory voucher store seeded with a fixed set of valid codes.
///
/// Suitable for development and tests; a deployment that enables
/// `require_voucher` in production should back this with the same Postgres pool the
/// session store uses instead.
pub struct InMemoryVoucherStore {
    valid: Mutex<HashSet<String>>,
    redeemed_by: Mutex<HashMap<String, String>>,
}

impl InMemoryVoucherStore {
    /// Seeds the store with `codes`, each redeemable exactly once.
    pub fn new(codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            valid: Mutex::new(codes.into_iter().collect()),
            redeemed_by: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn redeem(&self, code: &str, access_key: &str) -> eyre::Result<bool> {
        if self.valid.lock().remove(code) {
            self.redeemed_by
                .lock()
                .insert(access_key.to_string(), code.to_string());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn is_redeemed(&self, access_key: &str) -> eyre::Result<bool> {
        Ok(self.redeemed_by.lock().contains_key(access_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redeems_each_code_exactly_once() {
        let store = InMemoryVoucherStore::new(["abc".to_string()]);
        assert!(store.redeem("abc", "alice").await.unwrap());
        assert!(!store.redeem("abc", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_code_is_not_redeemable() {
        let store = InMemoryVoucherStore::new([]);
        assert!(!store.redeem("nope", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn redemption_is_tracked_by_access_key() {
        let store = InMemoryVoucherStore::new(["abc".to_string()]);
        assert!(!store.is_redeemed("alice").await.unwrap());
        store.redeem("abc", "alice").await.unwrap();
        assert!(store.is_redeemed("alice").await.unwrap());
        assert!(!store.is_redeemed("bob").await.unwrap());
    }
}
