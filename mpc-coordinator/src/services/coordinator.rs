//! The orchestrator called by clients: admission, proof verification, party fanout,
//! and session persistence.
//!
//! State machine for a sharing session:
//!
//! ```text
//! IDLE --add_user--> QUEUED --head + computation_key--> READY
//! READY --share_data accepted--> VERIFYING --fanout--> RUNNING
//! RUNNING --all ok, commitments match--> PERSISTED --finish--> IDLE
//! RUNNING --any failure--> ABORTED --finish--> IDLE
//! ```
//!
//! The state machine itself is not reified as an enum: each stage is a step in
//! [`Coordinator::share_data`]/[`Coordinator::query_computation`], and failure at any
//! step short-circuits to the caller with no further mutation (a linear `?`-chain
//! rather than a hand-rolled state object).

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use mpc_engine::port_allocator::PortAllocator;
use mpc_engine::proof_verifier::ProofVerifierService;
use mpc_types::api::consumer::QueryComputationStatsResponse;
use mpc_types::api::coordinator::{
    FinishComputationRequest, QueryComputationRequest, ShareDataRequest, ValidateComputationKeyRequest,
};
use mpc_types::api::party::{RequestQueryingComputationMpcRequest, RequestSharingDataMpcRequest};
use mpc_types::proof::CommitmentHex;
use mpc_types::queue::{AccessKey, AddUserResult, ComputationKey, QueuePosition};
use mpc_types::session::SessionRecord;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::CoordinatorConfig;
use crate::metrics::{
    METRICS_ID_QUERY_FANOUT_DURATION, METRICS_ID_QUERY_SESSIONS, METRICS_ID_SHARING_FANOUT_DURATION,
    METRICS_ID_SHARING_SESSIONS,
};
use crate::services::party_client::{PartyClient, PartyClientError};
use crate::services::session_store::{InsertSessionError, SessionStoreService};
use crate::services::user_queue::UserQueue;
use crate::services::voucher_store::VoucherStoreService;

/// Everything that can go wrong servicing a coordinator request.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// `client_id` was at or beyond `max_client_id`.
    #[error("client_id {0} exceeds max_client_id")]
    ClientIdOutOfRange(u32),
    /// The caller is not the current queue head, or presented a stale
    /// `computation_key`.
    #[error("caller is not the current queue head")]
    NotHead,
    /// `prohibit_multiple_contributions` is set and this uid already contributed.
    #[error("uid {0} has already contributed data")]
    DuplicateUid(u64),
    /// The external notarization proof verifier rejected the proof.
    #[error("proof invalid: {0}")]
    ProofInvalid(String),
    /// Parties disagreed on the resulting commitment, or it disagreed with the proof.
    #[error("commitment mismatch across parties or against the proof")]
    CommitmentMismatch,
    /// Parties revealed disagreeing statistics for the same query.
    #[error("query statistics mismatch across parties")]
    StatsMismatch,
    /// A party was unreachable, timed out, or returned a non-success status.
    #[error("party fanout failed: {0}")]
    PeerFailure(String),
    /// The overall fanout exceeded `fanout_timeout`.
    #[error("party fanout timed out")]
    FanoutTimeout,
    /// Persisting the session record or proof file failed.
    #[error("local failure: {0}")]
    LocalFailure(String),
}

impl From<PartyClientError> for CoordinatorError {
    fn from(value: PartyClientError) -> Self {
        CoordinatorError::PeerFailure(value.to_string())
    }
}

/// The orchestrator state shared across requests.
///
/// `sharing_lock` is a struct field, not a module-level global: it guarantees at most
/// one sharing session runs fanout at a time, and also serializes query sessions
/// against sharing sessions.
pub struct Coordinator {
    queue: SyncMutex<UserQueue>,
    ports: SyncMutex<PortAllocator>,
    sharing_lock: AsyncMutex<()>,
    parties: Vec<PartyClient>,
    session_store: SessionStoreService,
    proof_verifier: ProofVerifierService,
    proofs_dir: std::path::PathBuf,
    max_client_id: u32,
    prohibit_multiple_contributions: bool,
    perform_commitment_check: bool,
    fanout_timeout: std::time::Duration,
    max_data_providers: u64,
    voucher_store: Option<VoucherStoreService>,
}

impl Coordinator {
    /// Builds a coordinator from `config` and its external collaborators.
    ///
    /// `voucher_store` backs both [`Coordinator::redeem_voucher`] and the
    /// voucher-redemption check `add_user`/`add_priority_user` perform before queue
    /// admission. Pass `None` when `CoordinatorConfig::require_voucher` is unset.
    pub fn new(
        config: &CoordinatorConfig,
        session_store: SessionStoreService,
        proof_verifier: ProofVerifierService,
        voucher_store: Option<VoucherStoreService>,
    ) -> Self {
        let parties = (0..config.num_parties as usize)
            .map(|i| {
                PartyClient::new(
                    mpc_types::session::PartyId(i),
                    config.party_base_url(i),
                    config.party_api_key.clone(),
                )
            })
            .collect();

        Self {
            queue: SyncMutex::new(UserQueue::new(
                config.user_queue_size,
                config.user_queue_head_timeout,
            )),
            ports: SyncMutex::new(PortAllocator::new(
                config.num_parties,
                config.free_ports_start,
                config.free_ports_end,
            )),
            sharing_lock: AsyncMutex::new(()),
            parties,
            session_store,
            proof_verifier,
            proofs_dir: config.proofs_dir.clone(),
            max_client_id: config.max_client_id,
            prohibit_multiple_contributions: config.prohibit_multiple_contributions,
            perform_commitment_check: config.perform_commitment_check,
            fanout_timeout: config.fanout_timeout,
            max_data_providers: config.max_data_providers,
            voucher_store,
        }
    }

    /// Redeems a one-time voucher code for `access_key`, if `require_voucher` is
    /// enabled.
    ///
    /// Returns `Ok(true)` on first redemption, `Ok(false)` if the code was already
    /// redeemed or never issued, and an error if voucher redemption is not configured.
    /// A successful redemption is what subsequently lets `access_key` pass the
    /// `add_user`/`add_priority_user` voucher check.
    pub async fn redeem_voucher(
        &self,
        code: &str,
        access_key: &AccessKey,
    ) -> Result<bool, CoordinatorError> {
        match &self.voucher_store {
            Some(store) => store
                .redeem(code, &access_key.0)
                .await
                .map_err(|e| CoordinatorError::LocalFailure(e.to_string())),
            None => Err(CoordinatorError::LocalFailure(
                "voucher redemption is not enabled on this coordinator".to_string(),
            )),
        }
    }

    /// Whether `access_key` may be admitted: always `true` when voucher redemption
    /// is disabled, otherwise only once a voucher has been redeemed for it.
    async fn is_admittable(&self, access_key: &AccessKey) -> Result<bool, CoordinatorError> {
        match &self.voucher_store {
            Some(store) => store
                .is_redeemed(&access_key.0)
                .await
                .map_err(|e| CoordinatorError::LocalFailure(e.to_string())),
            None => Ok(true),
        }
    }

    /// Implements `add_user_to_queue`.
    pub async fn add_user(&self, access_key: AccessKey) -> Result<AddUserResult, CoordinatorError> {
        if !self.is_admittable(&access_key).await? {
            return Ok(AddUserResult::VoucherRequired);
        }
        Ok(self.queue.lock().add_user(access_key))
    }

    /// Implements `add_priority_user_to_queue`.
    pub async fn add_priority_user(
        &self,
        access_key: AccessKey,
    ) -> Result<AddUserResult, CoordinatorError> {
        if !self.is_admittable(&access_key).await? {
            return Ok(AddUserResult::VoucherRequired);
        }
        Ok(self.queue.lock().add_priority_user(access_key))
    }

    /// Implements `get_position`. Returns the computation key alongside it iff the
    /// caller is head.
    pub fn get_position(
        &self,
        access_key: &AccessKey,
    ) -> (Option<QueuePosition>, Option<ComputationKey>) {
        let mut queue = self.queue.lock();
        let position = queue.get_position(access_key).map(QueuePosition);
        let computation_key = queue.get_computation_key(access_key);
        (position, computation_key)
    }

    /// Implements `validate_computation_key`.
    pub fn validate_computation_key(&self, req: &ValidateComputationKeyRequest) -> bool {
        self.queue
            .lock()
            .validate_computation_key(&req.access_key, &req.computation_key)
    }

    /// Implements `finish_computation`.
    pub fn finish_computation(&self, req: &FinishComputationRequest) -> bool {
        self.queue
            .lock()
            .finish_computation(&req.access_key, &req.computation_key)
    }

    /// Implements `has_address_shared_data`.
    pub async fn has_address_shared_data(&self, eth_address: &str) -> eyre::Result<bool> {
        self.session_store.exists_eth_address(eth_address).await
    }

    fn require_head(
        &self,
        access_key: &AccessKey,
        computation_key: &ComputationKey,
    ) -> Result<(), CoordinatorError> {
        if self
            .queue
            .lock()
            .validate_computation_key(access_key, computation_key)
        {
            Ok(())
        } else {
            Err(CoordinatorError::NotHead)
        }
    }

    /// Implements `share_data`. Returns the client-side port base to hand back to the
    /// caller.
    pub async fn share_data(
        &self,
        req: ShareDataRequest,
    ) -> Result<u16, CoordinatorError> {
        self.require_head(&req.access_key, &req.computation_key)?;
        if req.client_id >= self.max_client_id {
            return Err(CoordinatorError::ClientIdOutOfRange(req.client_id));
        }

        let verified = self
            .proof_verifier
            .verify(&req.tlsn_proof)
            .await
            .map_err(|e| CoordinatorError::ProofInvalid(e.to_string()))?;

        if self.prohibit_multiple_contributions
            && self
                .session_store
                .exists_uid(verified.uid)
                .await
                .map_err(|e| CoordinatorError::LocalFailure(e.to_string()))?
        {
            return Err(CoordinatorError::DuplicateUid(verified.uid));
        }

        let _sharing_guard = self.sharing_lock.lock().await;

        let secret_index = self.session_store.count().await.unwrap_or(0);
        let ports = self.ports.lock().sharing_ports();

        let fanout_start = Instant::now();
        let requests = self.parties.iter().map(|party| {
            let req = RequestSharingDataMpcRequest {
                tlsn_proof: req.tlsn_proof.clone(),
                mpc_port_base: ports.server_base,
                secret_index,
                client_id: req.client_id,
                client_port_base: ports.client_base,
                client_cert_file: req.client_cert_file.clone(),
            };
            async move { party.request_sharing_data_mpc(&req).await }
        });

        let responses = self
            .bounded_fanout(requests)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        metrics::histogram!(METRICS_ID_SHARING_FANOUT_DURATION)
            .record(fanout_start.elapsed().as_secs_f64() * 1000.0);

        let commitment = self.agree_on_commitment(&responses, &verified)?;

        let proof_path = self
            .persist_proof(&req.tlsn_proof, secret_index + 1)
            .await
            .map_err(|e| CoordinatorError::LocalFailure(e.to_string()))?;

        self.session_store
            .insert(&req.eth_address, verified.uid, &proof_path)
            .await
            .map_err(|err| match err {
                InsertSessionError::DuplicateUid(uid) => CoordinatorError::DuplicateUid(uid),
                InsertSessionError::Other(err) => CoordinatorError::LocalFailure(err.to_string()),
            })?;

        metrics::counter!(METRICS_ID_SHARING_SESSIONS, "outcome" => "persisted").increment(1);
        let _ = commitment;
        Ok(ports.client_base)
    }

    fn agree_on_commitment(
        &self,
        responses: &[mpc_types::api::party::RequestSharingDataMpcResponse],
        verified: &mpc_types::proof::VerifiedProof,
    ) -> Result<CommitmentHex, CoordinatorError> {
        let first = responses
            .first()
            .map(|r| r.data_commitment.clone())
            .ok_or_else(|| CoordinatorError::PeerFailure("no parties configured".into()))?;
        if responses
            .iter()
            .any(|r| r.data_commitment != first)
        {
            metrics::counter!(METRICS_ID_SHARING_SESSIONS, "outcome" => "aborted").increment(1);
            return Err(CoordinatorError::CommitmentMismatch);
        }
        if self.perform_commitment_check && first != verified.commitment_hash {
            metrics::counter!(METRICS_ID_SHARING_SESSIONS, "outcome" => "aborted").increment(1);
            return Err(CoordinatorError::CommitmentMismatch);
        }
        Ok(first)
    }

    async fn persist_proof(&self, proof: &str, session_id: u64) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.proofs_dir).await?;
        let path = self
            .proofs_dir
            .join(format!("proof_{session_id}.json"));
        tokio::fs::write(&path, proof).await?;
        Ok(path.display().to_string())
    }

    /// Implements `query_computation`. Returns the client-side port base plus the
    /// statistics the parties' MPC run revealed, so both the public HTTP handler
    /// (which only returns the port base) and the `ConsumerCache` (which wants the
    /// statistics too) can share this one path.
    pub async fn query_computation(
        &self,
        req: QueryComputationRequest,
    ) -> Result<(u16, QueryComputationStatsResponse), CoordinatorError> {
        self.require_head(&req.access_key, &req.computation_key)?;
        if req.client_id >= self.max_client_id {
            return Err(CoordinatorError::ClientIdOutOfRange(req.client_id));
        }

        let _sharing_guard = self.sharing_lock.lock().await;

        let num_data_providers = self
            .session_store
            .count()
            .await
            .map_err(|e| CoordinatorError::LocalFailure(e.to_string()))?
            .min(self.max_data_providers);
        let ports = self.ports.lock().next_query_ports();

        let fanout_start = Instant::now();
        let requests = self.parties.iter().map(|party| {
            let req = RequestQueryingComputationMpcRequest {
                num_data_providers,
                mpc_port_base: ports.server_base,
                client_id: req.client_id,
                client_port_base: ports.client_base,
                client_cert_file: req.client_cert_file.clone(),
            };
            async move { party.request_querying_computation_mpc(&req).await }
        });

        let responses = self
            .bounded_fanout(requests)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        metrics::histogram!(METRICS_ID_QUERY_FANOUT_DURATION)
            .record(fanout_start.elapsed().as_secs_f64() * 1000.0);

        let stats = self.agree_on_query_stats(&responses)?;
        metrics::counter!(METRICS_ID_QUERY_SESSIONS, "outcome" => "completed").increment(1);
        Ok((ports.client_base, stats))
    }

    fn agree_on_query_stats(
        &self,
        responses: &[mpc_types::api::party::RequestQueryingComputationMpcResponse],
    ) -> Result<QueryComputationStatsResponse, CoordinatorError> {
        let first = responses
            .first()
            .map(|r| r.stats)
            .ok_or_else(|| CoordinatorError::PeerFailure("no parties configured".into()))?;
        if responses.iter().any(|r| r.stats != first) {
            metrics::counter!(METRICS_ID_QUERY_SESSIONS, "outcome" => "aborted").increment(1);
            return Err(CoordinatorError::StatsMismatch);
        }
        Ok(first)
    }

    async fn bounded_fanout<F, T>(
        &self,
        futures: impl IntoIterator<Item = F>,
    ) -> Result<Vec<Result<T, PartyClientError>>, CoordinatorError>
    where
        F: std::future::Future<Output = Result<T, PartyClientError>>,
    {
        tokio::time::timeout(self.fanout_timeout, join_all(futures))
            .await
            .map_err(|_| CoordinatorError::FanoutTimeout)
    }

    /// Enqueues `access_key` with priority and polls the queue until it becomes head,
    /// returning its `computation_key`. Used by the [`super::consumer_cache::ConsumerCache`]
    /// refresher, which admits itself through the queue like normal users but is
    /// exempt from the voucher check: it is an internal, reserved `access_key`, not a
    /// caller-supplied one.
    pub async fn run_as_priority_client(
        &self,
        access_key: AccessKey,
        poll_interval: std::time::Duration,
    ) -> ComputationKey {
        self.queue.lock().add_priority_user(access_key.clone());
        loop {
            if let Some(key) = self.queue.lock().get_computation_key(&access_key) {
                return key;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Returns the number of sessions persisted so far.
    pub async fn session_count(&self) -> eyre::Result<u64> {
        self.session_store.count().await
    }
}

/// Shared handle to a [`Coordinator`], stored in Axum state.
pub type CoordinatorService = Arc<Coordinator>;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mpc_types::proof::VerifiedProof;
    use mpc_types::session::SessionId;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct InMemorySessionStore {
        records: SyncMutex<Vec<SessionRecord>>,
        next_id: AtomicU64,
    }

    impl InMemorySessionStore {
        fn new() -> Self {
            Self {
                records: SyncMutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }
        }
    }

    #[async_trait]
    impl crate::services::session_store::SessionStore for InMemorySessionStore {
        async fn count(&self) -> eyre::Result<u64> {
            Ok(self.records.lock().len() as u64)
        }

        async fn insert(
            &self,
            eth_address: &str,
            uid: u64,
            proof_path: &str,
        ) -> Result<SessionRecord, InsertSessionError> {
            let record = SessionRecord {
                id: SessionId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                eth_address: eth_address.to_string(),
                uid,
                proof_path: proof_path.to_string(),
            };
            self.records.lock().push(record.clone());
            Ok(record)
        }

        async fn exists_uid(&self, uid: u64) -> eyre::Result<bool> {
            Ok(self.records.lock().iter().any(|r| r.uid == uid))
        }

        async fn exists_eth_address(&self, eth_address: &str) -> eyre::Result<bool> {
            Ok(self
                .records
                .lock()
                .iter()
                .any(|r| r.eth_address == eth_address))
        }
    }

    fn test_config() -> CoordinatorConfig {
        CoordinatorConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            num_parties: 0,
            party_hosts: vec![],
            party_ports: vec![],
            party_web_protocol: crate::config::PartyWebProtocol::Http,
            party_api_key: secrecy::SecretString::from("test-key".to_string()),
            free_ports_start: 10000,
            free_ports_end: 10100,
            user_queue_size: 10,
            user_queue_head_timeout: Duration::from_secs(60),
            prohibit_multiple_contributions: true,
            perform_commitment_check: true,
            cache_ttl_seconds: Duration::from_secs(60),
            max_data_providers: 1_000_000,
            max_client_id: 1_000_000,
            fanout_timeout: Duration::from_secs(5),
            verifier_bin: "/bin/true".into(),
            proofs_dir: std::env::temp_dir().join("mpc-coordinator-test-proofs"),
            db_connection_string: secrecy::SecretString::from(String::new()),
            db_schema: "public".to_string(),
            max_db_connections: 1,
            require_voucher: false,
            voucher_codes: vec![],
            max_wait_time_shutdown: Duration::from_secs(1),
        }
    }

    fn accepting_verifier(uid: u64) -> ProofVerifierService {
        Arc::new(mpc_test_utils::FakeProofVerifier::accepting(VerifiedProof {
            uid,
            commitment_hash: CommitmentHex("deadbeef".to_string()),
            deltas: vec![[1u8; 16]],
            zero_encodings: vec![vec![0u8]; 8],
            input_bytes: 1,
        }))
    }

    #[tokio::test]
    async fn has_address_shared_data_reflects_persisted_sessions() {
        let store: SessionStoreService = Arc::new(InMemorySessionStore::new());
        let coordinator = Coordinator::new(&test_config(), store.clone(), accepting_verifier(1), None);
        assert!(!coordinator
            .has_address_shared_data("0xAB")
            .await
            .unwrap());
        store.insert("0xAB", 1, "proofs/proof_1.json").await.unwrap();
        assert!(coordinator.has_address_shared_data("0xAB").await.unwrap());
    }

    #[tokio::test]
    async fn queue_admission_delegates_to_user_queue() {
        let store: SessionStoreService = Arc::new(InMemorySessionStore::new());
        let coordinator = Coordinator::new(&test_config(), store, accepting_verifier(1), None);
        assert_eq!(
            coordinator.add_user(AccessKey("a".to_string())).await.unwrap(),
            AddUserResult::Succeeded
        );
        let (position, key) = coordinator.get_position(&AccessKey("a".to_string()));
        assert_eq!(position, Some(QueuePosition(0)));
        assert!(key.is_some());
    }

    #[tokio::test]
    async fn queue_admission_requires_redeemed_voucher_when_enabled() {
        let store: SessionStoreService = Arc::new(InMemorySessionStore::new());
        let voucher_store: VoucherStoreService = Arc::new(
            crate::services::voucher_store::InMemoryVoucherStore::new(["abc".to_string()]),
        );
        let coordinator = Coordinator::new(
            &test_config(),
            store,
            accepting_verifier(1),
            Some(voucher_store),
        );

        let access_key = AccessKey("a".to_string());
        assert_eq!(
            coordinator.add_user(access_key.clone()).await.unwrap(),
            AddUserResult::VoucherRequired
        );

        coordinator.redeem_voucher("abc", &access_key).await.unwrap();
        assert_eq!(
            coordinator.add_user(access_key).await.unwrap(),
            AddUserResult::Succeeded
        );
    }
}
