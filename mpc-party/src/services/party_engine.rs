//! The per-party worker driving a single local MPC execution.
//!
//! Every mutating operation holds [`PartyEngine`]'s `mutation_lock` for its whole
//! duration: the share file is the one piece of durable state a party owns, and only
//! one request may touch it at a time. On any failure after the backup step the share
//! file is rolled back before the error is returned, so callers never observe a
//! partially-mutated file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use mpc_engine::cert_rehash::{CertRehashError, CertRehasherService};
use mpc_engine::program::templates::{QueryParams, SharingParams, render_query_program, render_sharing_program};
use mpc_engine::program::{
    CompiledProgram, ProgramCompiler, ProgramError, ProgramRunner, parse_commitment_hex,
    parse_query_stats, query_stats_from_registers,
};
use mpc_engine::proof_verifier::{ProofVerifierError, ProofVerifierService};
use mpc_types::api::consumer::QueryComputationStatsResponse;
use mpc_types::api::party::{RequestQueryingComputationMpcRequest, RequestSharingDataMpcRequest};
use mpc_types::proof::CommitmentHex;
use mpc_types::session::PartyId;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use crate::config::PartyConfig;
use crate::metrics::{
    METRICS_ID_PARTY_QUERY_SUCCESS, METRICS_ID_PARTY_SHARING_ROLLBACK,
    METRICS_ID_PARTY_SHARING_SUCCESS,
};

/// Everything that can go wrong servicing a party request.
#[derive(Debug, thiserror::Error)]
pub enum PartyEngineError {
    /// `secret_index` was at or beyond the configured maximum.
    #[error("secret_index {0} exceeds max_data_providers")]
    SecretIndexOutOfRange(u64),
    /// The notarization proof was rejected.
    #[error("proof invalid: {0}")]
    ProofInvalid(String),
    /// A query was requested but this party has no share file yet.
    #[error("no share file present for this party")]
    NoShareFile,
    /// A peer's certificate could not be fetched.
    #[error("could not fetch peer cert: {0}")]
    PeerFetchFailed(String),
    /// Compiling or running the MPC program failed, or local file I/O failed.
    #[error(transparent)]
    Local(#[from] ProgramError),
    /// Filesystem I/O outside of the program compiler/runner failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Rebuilding the player-data certificate hash index failed.
    #[error(transparent)]
    CertRehash(#[from] CertRehashError),
}

impl From<ProofVerifierError> for PartyEngineError {
    fn from(value: ProofVerifierError) -> Self {
        match value {
            ProofVerifierError::Rejected(msg) => PartyEngineError::ProofInvalid(msg),
            ProofVerifierError::Io(err) => PartyEngineError::Io(err),
            ProofVerifierError::Invariant(err) => PartyEngineError::ProofInvalid(err.to_string()),
        }
    }
}

/// Whether a share file existed before this operation started.
enum BackupState {
    /// No share file existed; on rollback it must be deleted again.
    FirstRun,
    /// The share file was copied to `path` before the operation started.
    Backed(PathBuf),
}

/// Drives sharing and querying MPC runs for one party.
pub struct PartyEngine {
    party_id: PartyId,
    max_data_providers: u64,
    fixed_point_scale: u64,
    data_dir: PathBuf,
    peer_hosts: Vec<String>,
    api_key: SecretString,
    http_client: reqwest::Client,
    compiler: Arc<dyn ProgramCompiler + Send + Sync>,
    runner: Arc<dyn ProgramRunner + Send + Sync>,
    proof_verifier: ProofVerifierService,
    rehasher: CertRehasherService,
    mutation_lock: Mutex<()>,
}

impl PartyEngine {
    /// Builds a party engine from `config` and its external capability collaborators.
    pub fn new(
        config: &PartyConfig,
        proof_verifier: ProofVerifierService,
        compiler: Arc<dyn ProgramCompiler + Send + Sync>,
        runner: Arc<dyn ProgramRunner + Send + Sync>,
        rehasher: CertRehasherService,
    ) -> Self {
        Self {
            party_id: config.party_id,
            max_data_providers: config.max_data_providers,
            fixed_point_scale: config.fixed_point_scale,
            data_dir: config.data_dir.clone(),
            peer_hosts: config.peer_hosts.clone(),
            api_key: config.api_key.clone(),
            http_client: reqwest::Client::new(),
            compiler,
            runner,
            proof_verifier,
            rehasher,
            mutation_lock: Mutex::new(()),
        }
    }

    /// This party's id.
    pub fn party_id(&self) -> PartyId {
        self.party_id
    }

    fn persistence_dir(&self) -> PathBuf {
        self.data_dir.join("Persistence")
    }

    fn share_file_path(&self) -> PathBuf {
        self.persistence_dir()
            .join(format!("Transactions-{}.data", self.party_id))
    }

    fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("Backup").join(self.party_id.to_string())
    }

    fn player_data_dir(&self) -> PathBuf {
        self.data_dir.join("Player-Data")
    }

    fn party_cert_path(&self) -> PathBuf {
        self.player_data_dir()
            .join(format!("{}.pem", self.party_id))
    }

    fn client_cert_path(&self, client_id: u32) -> PathBuf {
        self.player_data_dir().join(format!("C{client_id}.pem"))
    }

    /// Reads this party's long-lived certificate. A pure read: no lock required.
    pub async fn get_party_cert(&self) -> Result<String, PartyEngineError> {
        Ok(tokio::fs::read_to_string(self.party_cert_path()).await?)
    }

    /// Implements `request_sharing_data_mpc`.
    pub async fn request_sharing_data_mpc(
        &self,
        params: RequestSharingDataMpcRequest,
    ) -> Result<CommitmentHex, PartyEngineError> {
        if params.secret_index >= self.max_data_providers {
            return Err(PartyEngineError::SecretIndexOutOfRange(params.secret_index));
        }
        let verified = self.proof_verifier.verify(&params.tlsn_proof).await?;

        let _guard = self.mutation_lock.lock().await;
        let backup = self.backup_share_file().await?;

        let result = self
            .run_sharing_program(&params, &verified)
            .await;

        match result {
            Ok(commitment) => {
                metrics::counter!(METRICS_ID_PARTY_SHARING_SUCCESS).increment(1);
                Ok(commitment)
            }
            Err(err) => {
                metrics::counter!(METRICS_ID_PARTY_SHARING_ROLLBACK).increment(1);
                self.restore_share_file(backup).await?;
                Err(err)
            }
        }
    }

    async fn run_sharing_program(
        &self,
        params: &RequestSharingDataMpcRequest,
        verified: &mpc_types::proof::VerifiedProof,
    ) -> Result<CommitmentHex, PartyEngineError> {
        tokio::fs::create_dir_all(self.player_data_dir()).await?;
        self.write_ip_descriptor(params.mpc_port_base).await?;
        self.install_client_cert(params.client_id, &params.client_cert_file)
            .await?;
        self.fetch_peer_certs().await?;

        let first_run = !tokio::fs::try_exists(self.share_file_path()).await?;
        let delta = *verified
            .deltas
            .first()
            .expect("verifier already checked deltas are non-empty and equal");
        let source = render_sharing_program(&SharingParams {
            party_id: self.party_id.0,
            secret_index: params.secret_index,
            max_data_providers: self.max_data_providers,
            input_bytes: verified.input_bytes,
            delta,
            zero_encodings: verified.zero_encodings.clone(),
            client_port_base: params.client_port_base,
            first_run,
        });

        let work_dir = self.persistence_dir();
        tokio::fs::create_dir_all(&work_dir).await?;
        let compiled = self.compiler.compile(&source, &work_dir).await?;
        let stdout = self.run_vm(&compiled, &work_dir).await?;
        Ok(parse_commitment_hex(&stdout)?)
    }

    /// Implements `request_querying_computation_mpc`.
    pub async fn request_querying_computation_mpc(
        &self,
        params: RequestQueryingComputationMpcRequest,
    ) -> Result<QueryComputationStatsResponse, PartyEngineError> {
        if !tokio::fs::try_exists(self.share_file_path()).await? {
            return Err(PartyEngineError::NoShareFile);
        }

        let _guard = self.mutation_lock.lock().await;
        tokio::fs::create_dir_all(self.player_data_dir()).await?;
        self.write_ip_descriptor(params.mpc_port_base).await?;
        self.install_client_cert(params.client_id, &params.client_cert_file)
            .await?;
        self.fetch_peer_certs().await?;

        let source = render_query_program(&QueryParams {
            party_id: self.party_id.0,
            num_data_providers: params.num_data_providers,
            client_port_base: params.client_port_base,
        });

        let work_dir = self.persistence_dir();
        let compiled = self.compiler.compile(&source, &work_dir).await?;
        let stdout = self.run_vm(&compiled, &work_dir).await?;
        let registers = parse_query_stats(&stdout)?;
        metrics::counter!(METRICS_ID_PARTY_QUERY_SUCCESS).increment(1);
        Ok(query_stats_from_registers(registers, self.fixed_point_scale))
    }

    async fn run_vm(
        &self,
        compiled: &CompiledProgram,
        work_dir: &Path,
    ) -> Result<String, ProgramError> {
        self.runner.run(compiled, self.party_id, work_dir).await
    }

    async fn backup_share_file(&self) -> Result<BackupState, PartyEngineError> {
        let share_file = self.share_file_path();
        if !tokio::fs::try_exists(&share_file).await? {
            return Ok(BackupState::FirstRun);
        }
        tokio::fs::create_dir_all(self.backup_dir()).await?;
        let timestamp = backup_timestamp();
        let backup_path = self.backup_dir().join(format!(
            "Transactions-{}.data.{timestamp}",
            self.party_id
        ));
        tokio::fs::copy(&share_file, &backup_path).await?;
        Ok(BackupState::Backed(backup_path))
    }

    async fn restore_share_file(&self, backup: BackupState) -> Result<(), PartyEngineError> {
        match backup {
            BackupState::FirstRun => {
                let _ = tokio::fs::remove_file(self.share_file_path()).await;
            }
            BackupState::Backed(backup_path) => {
                tokio::fs::copy(&backup_path, self.share_file_path()).await?;
            }
        }
        Ok(())
    }

    async fn write_ip_descriptor(&self, mpc_port_base: u16) -> Result<(), PartyEngineError> {
        let descriptor = self
            .peer_hosts
            .iter()
            .enumerate()
            .map(|(i, host)| format!("{host}:{}", mpc_port_base + i as u16))
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::create_dir_all(self.persistence_dir()).await?;
        tokio::fs::write(self.persistence_dir().join("HOSTS"), descriptor).await?;
        Ok(())
    }

    /// Clears stale client certificate material from `Player-Data/`, writes this
    /// session's client cert, and rehashes the directory's certificate hash index.
    async fn install_client_cert(
        &self,
        client_id: u32,
        client_cert_file: &str,
    ) -> Result<(), PartyEngineError> {
        self.sweep_stale_certs().await?;
        let path = self.client_cert_path(client_id);
        tokio::fs::write(&path, client_cert_file).await?;
        self.rehasher.rehash(&self.player_data_dir()).await?;
        Ok(())
    }

    /// Removes every `*.0` hash symlink and `C*.pem` client cert left over from a
    /// previous session, so the directory the rehash command indexes only ever
    /// reflects the current session's certificate set.
    async fn sweep_stale_certs(&self) -> Result<(), PartyEngineError> {
        let dir = self.player_data_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_stale_hash_symlink = name
                .strip_suffix(".0")
                .is_some_and(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_hexdigit()));
            let is_client_cert = name.starts_with('C') && name.ends_with(".pem");
            if is_stale_hash_symlink || is_client_cert {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    /// Fetches every other party's certificate concurrently over the admin API.
    async fn fetch_peer_certs(&self) -> Result<Vec<String>, PartyEngineError> {
        let fetches = self
            .peer_hosts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.party_id.0)
            .map(|(_, host)| self.fetch_one_peer_cert(host.clone()));
        try_join_all(fetches).await
    }

    async fn fetch_one_peer_cert(&self, host: String) -> Result<String, PartyEngineError> {
        let response = self
            .http_client
            .get(format!("http://{host}/get_party_cert"))
            .header("X-API-Key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| PartyEngineError::PeerFetchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PartyEngineError::PeerFetchFailed(format!(
                "peer {host} returned {}",
                response.status()
            )));
        }
        let body: mpc_types::api::party::GetPartyCertResponse = response
            .json()
            .await
            .map_err(|e| PartyEngineError::PeerFetchFailed(e.to_string()))?;
        Ok(body.cert_file)
    }
}

fn backup_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs();
    secs.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpc_test_utils::{FakeCertRehasher, FakeProgramCompiler, FakeProgramRunner, FakeProofVerifier};
    use mpc_types::proof::VerifiedProof;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn unique_data_dir(label: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        std::env::temp_dir().join(format!(
            "mpc-party-test-{label}-{}",
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }

    fn test_config(data_dir: PathBuf) -> PartyConfig {
        PartyConfig {
            party_id: PartyId(0),
            api_key: SecretString::from("test-key".to_string()),
            max_data_providers: 1_000_000,
            fixed_point_scale: 100,
            data_dir,
            verifier_bin: "/bin/true".into(),
            compiler_bin: "/bin/true".into(),
            vm_bin: "/bin/true".into(),
            rehash_bin: "/bin/true".into(),
            host: "127.0.0.1".to_string(),
            peer_hosts: vec!["127.0.0.1:0".to_string()],
        }
    }

    fn accepting_verifier(uid: u64) -> ProofVerifierService {
        Arc::new(FakeProofVerifier::accepting(VerifiedProof {
            uid,
            commitment_hash: CommitmentHex("deadbeef".to_string()),
            deltas: vec![[1u8; 16]],
            zero_encodings: vec![vec![0u8]; 8],
            input_bytes: 1,
        }))
    }

    fn engine(
        data_dir: PathBuf,
        runner: Arc<dyn ProgramRunner + Send + Sync>,
        rehasher: CertRehasherService,
    ) -> PartyEngine {
        PartyEngine::new(
            &test_config(data_dir),
            accepting_verifier(1),
            Arc::new(FakeProgramCompiler),
            runner,
            rehasher,
        )
    }

    fn sharing_request(client_id: u32, secret_index: u64) -> RequestSharingDataMpcRequest {
        RequestSharingDataMpcRequest {
            tlsn_proof: "unused-by-the-fake-verifier".to_string(),
            mpc_port_base: 20000,
            secret_index,
            client_id,
            client_port_base: 21000,
            client_cert_file: "client-cert-pem".to_string(),
        }
    }

    fn query_request(client_id: u32) -> RequestQueryingComputationMpcRequest {
        RequestQueryingComputationMpcRequest {
            num_data_providers: 2,
            mpc_port_base: 22000,
            client_id,
            client_port_base: 23000,
            client_cert_file: "client-cert-pem".to_string(),
        }
    }

    #[tokio::test]
    async fn sharing_success_returns_commitment_and_installs_client_cert() {
        let data_dir = unique_data_dir("sharing-success");
        let fake_rehasher = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::fixed("deadbeef"));
        let engine = engine(data_dir.clone(), runner, fake_rehasher.clone());

        let commitment = engine
            .request_sharing_data_mpc(sharing_request(7, 0))
            .await
            .expect("sharing succeeds");
        assert_eq!(commitment.0, "deadbeef");

        let client_cert = tokio::fs::read_to_string(engine.client_cert_path(7))
            .await
            .expect("client cert written");
        assert_eq!(client_cert, "client-cert-pem");
        assert_eq!(fake_rehasher.calls().len(), 1);
    }

    #[tokio::test]
    async fn sharing_rollback_on_vm_failure_preserves_existing_share_file() {
        let data_dir = unique_data_dir("sharing-rollback");
        tokio::fs::create_dir_all(data_dir.join("Persistence"))
            .await
            .unwrap();
        let share_file = data_dir
            .join("Persistence")
            .join(format!("Transactions-{}.data", 0));
        tokio::fs::write(&share_file, "original-share-data")
            .await
            .unwrap();

        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::failing("vm crashed"));
        let engine = engine(data_dir, runner, rehasher);

        let result = engine.request_sharing_data_mpc(sharing_request(3, 1)).await;
        assert!(result.is_err());

        let content = tokio::fs::read_to_string(&share_file).await.unwrap();
        assert_eq!(content, "original-share-data");
    }

    #[tokio::test]
    async fn sharing_rollback_on_first_run_removes_share_file() {
        let data_dir = unique_data_dir("sharing-rollback-first-run");
        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::failing("vm crashed"));
        let engine = engine(data_dir, runner, rehasher);

        let result = engine.request_sharing_data_mpc(sharing_request(3, 0)).await;
        assert!(result.is_err());
        assert!(!tokio::fs::try_exists(engine.share_file_path()).await.unwrap());
    }

    #[tokio::test]
    async fn querying_computation_without_share_file_errors() {
        let data_dir = unique_data_dir("query-no-share-file");
        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::fixed_query_stats([2, 200, 200, 100, 400]));
        let engine = engine(data_dir, runner, rehasher);

        let result = engine.request_querying_computation_mpc(query_request(1)).await;
        assert!(matches!(result, Err(PartyEngineError::NoShareFile)));
    }

    #[tokio::test]
    async fn querying_computation_success_returns_descaled_stats() {
        let data_dir = unique_data_dir("query-success");
        tokio::fs::create_dir_all(data_dir.join("Persistence"))
            .await
            .unwrap();
        let share_file = data_dir
            .join("Persistence")
            .join(format!("Transactions-{}.data", 0));
        tokio::fs::write(&share_file, "some-share-data").await.unwrap();

        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::fixed_query_stats([2, 200, 200, 100, 400]));
        let engine = engine(data_dir, runner, rehasher);

        let stats = engine
            .request_querying_computation_mpc(query_request(1))
            .await
            .expect("query succeeds");
        let expected = query_stats_from_registers([2, 200, 200, 100, 400], 100);
        assert_eq!(stats.num_data_providers, expected.num_data_providers);
        assert!((stats.mean - expected.mean).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn install_client_cert_sweeps_stale_certs_before_rehashing() {
        let data_dir = unique_data_dir("cert-sweep");
        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::fixed("deadbeef"));
        let engine = engine(data_dir, runner, rehasher);

        tokio::fs::create_dir_all(engine.player_data_dir()).await.unwrap();
        tokio::fs::write(engine.player_data_dir().join("C2.pem"), "stale-client-cert")
            .await
            .unwrap();
        tokio::fs::write(engine.player_data_dir().join("ab12ef00.0"), "stale-symlink-target")
            .await
            .unwrap();
        tokio::fs::write(engine.party_cert_path(), "own-long-lived-cert")
            .await
            .unwrap();

        engine
            .install_client_cert(9, "fresh-client-cert")
            .await
            .expect("install succeeds");

        assert!(!tokio::fs::try_exists(engine.player_data_dir().join("C2.pem"))
            .await
            .unwrap());
        assert!(!tokio::fs::try_exists(engine.player_data_dir().join("ab12ef00.0"))
            .await
            .unwrap());
        assert_eq!(
            tokio::fs::read_to_string(engine.party_cert_path()).await.unwrap(),
            "own-long-lived-cert"
        );
        assert_eq!(
            tokio::fs::read_to_string(engine.client_cert_path(9)).await.unwrap(),
            "fresh-client-cert"
        );
    }

    #[tokio::test]
    async fn backup_and_restore_is_byte_identical() {
        let data_dir = unique_data_dir("backup-restore");
        let rehasher: CertRehasherService = Arc::new(FakeCertRehasher::default());
        let runner = Arc::new(FakeProgramRunner::fixed("deadbeef"));
        let engine = engine(data_dir, runner, rehasher);

        tokio::fs::create_dir_all(engine.persistence_dir()).await.unwrap();
        tokio::fs::write(engine.share_file_path(), "share-file-contents-v1")
            .await
            .unwrap();

        let backup = engine.backup_share_file().await.unwrap();
        tokio::fs::write(engine.share_file_path(), "corrupted-by-a-crashing-vm")
            .await
            .unwrap();
        engine.restore_share_file(backup).await.unwrap();

        let restored = tokio::fs::read_to_string(engine.share_file_path())
            .await
            .unwrap();
        assert_eq!(restored, "share-file-contents-v1");
    }
}
