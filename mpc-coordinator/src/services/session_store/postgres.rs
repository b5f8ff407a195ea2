//! Postgres-backed [`SessionStore`].
//!
//! Uniqueness on `uid` is enforced at the database layer by a unique index created
//! only when the coordinator is configured with `prohibit_multiple_contributions`,
//! so the constraint can be toggled per deployment without a schema migration per
//! environment.

use async_trait::async_trait;
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use sqlx::{Executor as _, PgPool, Row as _, postgres::PgPoolOptions};
use tracing::instrument;

use mpc_types::session::{SessionId, SessionRecord};

use super::{InsertSessionError, SessionStore};

/// Session store backed by a single-connection Postgres pool.
pub struct PostgresSessionStore {
    pool: PgPool,
    prohibit_multiple_contributions: bool,
}

fn sanitize_identifier(input: &str) -> eyre::Result<()> {
    eyre::ensure!(!input.is_empty(), "empty schema is not allowed");
    eyre::ensure!(
        input.chars().all(|c| c.is_alphanumeric() || c == '_'),
        "invalid SQL identifier: {input}"
    );
    Ok(())
}

impl PostgresSessionStore {
    /// Connects to Postgres, runs migrations, and (if configured) adds the `uid`
    /// uniqueness constraint.
    #[instrument(level = "info", skip_all)]
    pub async fn init(
        connection_string: &SecretString,
        schema: &str,
        max_connections: u32,
        prohibit_multiple_contributions: bool,
    ) -> eyre::Result<Self> {
        sanitize_identifier(schema).context("while validating schema name")?;
        let schema_connect = format!(
            r#"CREATE SCHEMA IF NOT EXISTS "{schema}"; SET search_path TO "{schema}";"#
        );
        tracing::info!("using schema: {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(move |conn, _| {
                let schema_connect = schema_connect.clone();
                Box::pin(async move {
                    conn.execute(schema_connect.as_ref()).await?;
                    Ok(())
                })
            })
            .connect(connection_string.expose_secret())
            .await
            .context("while connecting to postgres DB")?;

        tracing::info!("running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("while running session store migrations")?;

        if prohibit_multiple_contributions {
            tracing::info!("enforcing uid uniqueness on sessions");
            sqlx::query(
                "CREATE UNIQUE INDEX IF NOT EXISTS sessions_uid_unique ON sessions (uid)",
            )
            .execute(&pool)
            .await
            .context("while creating uid uniqueness index")?;
        }

        Ok(Self {
            pool,
            prohibit_multiple_contributions,
        })
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn count(&self) -> eyre::Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM sessions")
            .fetch_one(&self.pool)
            .await
            .context("while counting sessions")?;
        let count: i64 = row.try_get("count").context("while reading count")?;
        Ok(count as u64)
    }

    async fn insert(
        &self,
        eth_address: &str,
        uid: u64,
        proof_path: &str,
    ) -> Result<SessionRecord, InsertSessionError> {
        let result = sqlx::query(
            "INSERT INTO sessions (eth_address, uid, proof_path) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(eth_address)
        .bind(uid as i64)
        .bind(proof_path)
        .fetch_one(&self.pool)
        .await;

        let row = match result {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err))
                if self.prohibit_multiple_contributions && db_err.is_unique_violation() =>
            {
                return Err(InsertSessionError::DuplicateUid(uid));
            }
            Err(err) => return Err(eyre::Error::from(err).into()),
        };

        let id: i64 = row.try_get("id").context("while reading inserted id")?;
        Ok(SessionRecord {
            id: SessionId(id as u64),
            eth_address: eth_address.to_string(),
            uid,
            proof_path: proof_path.to_string(),
        })
    }

    async fn exists_uid(&self, uid: u64) -> eyre::Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM sessions WHERE uid = $1) AS exists")
            .bind(uid as i64)
            .fetch_one(&self.pool)
            .await
            .context("while checking uid existence")?;
        row.try_get("exists").context("while reading exists flag")
    }

    async fn exists_eth_address(&self, eth_address: &str) -> eyre::Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE eth_address = $1) AS exists",
        )
        .bind(eth_address)
        .fetch_one(&self.pool)
        .await
        .context("while checking eth_address existence")?;
        row.try_get("exists").context("while reading exists flag")
    }
}
