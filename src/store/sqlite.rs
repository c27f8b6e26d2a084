// ABOUTME: SQLite deployment store backed by sqlx.
// ABOUTME: One row per saga in `deployments`; schema is created on connect.

use super::{DeploymentStore, StoreError};
use crate::saga::{DeploymentRecord, DeploymentState};
use crate::types::{AuthToken, DeploymentId, RequestId, WhitelistId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;

const COLUMNS: &str = "id, request_id, auth_token, contract_name, contract_bytecode, \
    constructor_args, network, requester_id, hash_value, signed_hash, transaction_hash, \
    contract_address, whitelist_id, whitelist_hash, signed_whitelist_hash, state, \
    error_message, version, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    ///
    /// In-memory databases are private to a connection, so they get a pool of one.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let max_connections = if is_memory_url(url) { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deployments (
                id TEXT PRIMARY KEY,
                request_id TEXT UNIQUE,
                auth_token TEXT,
                contract_name TEXT NOT NULL,
                contract_bytecode TEXT NOT NULL,
                constructor_args TEXT,
                network TEXT,
                requester_id TEXT,
                hash_value TEXT,
                signed_hash TEXT,
                transaction_hash TEXT,
                contract_address TEXT,
                whitelist_id TEXT,
                whitelist_hash TEXT,
                signed_whitelist_hash TEXT,
                state TEXT NOT NULL,
                error_message TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_deployments_state ON deployments (state)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<DeploymentRecord, StoreError> {
        let state_str: String = row.try_get("state")?;
        let state = DeploymentState::from_str(&state_str)
            .map_err(|e| StoreError::Serialisation(e.to_string()))?;

        Ok(DeploymentRecord {
            id: DeploymentId::new(row.try_get::<String, _>("id")?),
            request_id: row
                .try_get::<Option<String>, _>("request_id")?
                .map(RequestId::new),
            auth_token: row
                .try_get::<Option<String>, _>("auth_token")?
                .map(AuthToken::new),
            contract_name: row.try_get("contract_name")?,
            contract_bytecode: row.try_get("contract_bytecode")?,
            constructor_args: row.try_get("constructor_args")?,
            network: row.try_get("network")?,
            requester_id: row.try_get("requester_id")?,
            hash_value: row.try_get("hash_value")?,
            signed_hash: row.try_get("signed_hash")?,
            transaction_hash: row.try_get("transaction_hash")?,
            contract_address: row.try_get("contract_address")?,
            whitelist_id: row
                .try_get::<Option<String>, _>("whitelist_id")?
                .map(WhitelistId::new),
            whitelist_hash: row.try_get("whitelist_hash")?,
            signed_whitelist_hash: row.try_get("signed_whitelist_hash")?,
            state,
            error_message: row.try_get("error_message")?,
            version: row.try_get("version")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    async fn fetch_one_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM deployments WHERE {column} = ?");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Map a unique-constraint failure on `request_id` to the domain error.
fn map_write_error(err: sqlx::Error, record: &DeploymentRecord) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            if db.message().contains("request_id") {
                if let Some(request_id) = record.request_id() {
                    return StoreError::DuplicateRequestId(request_id.clone());
                }
            }
            return StoreError::DuplicateId(record.id().clone());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl DeploymentStore for SqliteStore {
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO deployments ({COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        sqlx::query(&sql)
            .bind(record.id.as_str())
            .bind(record.request_id.as_ref().map(RequestId::as_str))
            .bind(record.auth_token.as_ref().map(AuthToken::expose))
            .bind(&record.contract_name)
            .bind(&record.contract_bytecode)
            .bind(&record.constructor_args)
            .bind(&record.network)
            .bind(&record.requester_id)
            .bind(&record.hash_value)
            .bind(&record.signed_hash)
            .bind(&record.transaction_hash)
            .bind(&record.contract_address)
            .bind(record.whitelist_id.as_ref().map(WhitelistId::as_str))
            .bind(&record.whitelist_hash)
            .bind(&record.signed_whitelist_hash)
            .bind(record.state.as_str())
            .bind(&record.error_message)
            .bind(record.version)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, record))?;

        Ok(())
    }

    async fn get(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>, StoreError> {
        self.fetch_one_where("id", id.as_str()).await
    }

    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        self.fetch_one_where("request_id", request_id.as_str()).await
    }

    async fn update(&self, record: &DeploymentRecord) -> Result<DeploymentRecord, StoreError> {
        let mut saved = record.clone();
        saved.version = record.version + 1;
        saved.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE deployments SET
                request_id = ?, auth_token = ?, hash_value = ?, signed_hash = ?,
                transaction_hash = ?, contract_address = ?, whitelist_id = ?,
                whitelist_hash = ?, signed_whitelist_hash = ?, state = ?,
                error_message = ?, version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(saved.request_id.as_ref().map(RequestId::as_str))
        .bind(saved.auth_token.as_ref().map(AuthToken::expose))
        .bind(&saved.hash_value)
        .bind(&saved.signed_hash)
        .bind(&saved.transaction_hash)
        .bind(&saved.contract_address)
        .bind(saved.whitelist_id.as_ref().map(WhitelistId::as_str))
        .bind(&saved.whitelist_hash)
        .bind(&saved.signed_whitelist_hash)
        .bind(saved.state.as_str())
        .bind(&saved.error_message)
        .bind(saved.version)
        .bind(saved.updated_at)
        .bind(record.id.as_str())
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, record))?;

        if result.rows_affected() == 0 {
            return match self.get(&record.id).await? {
                Some(_) => Err(StoreError::Conflict {
                    id: record.id.clone(),
                    expected_version: record.version,
                }),
                None => Err(StoreError::NotFound(record.id.clone())),
            };
        }

        Ok(saved)
    }
}
