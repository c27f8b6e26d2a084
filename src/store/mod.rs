// ABOUTME: Persistence seam for deployment saga records.
// ABOUTME: Optimistic concurrency via a version counter; request ids are unique.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::saga::DeploymentRecord;
use crate::types::{DeploymentId, RequestId};
use async_trait::async_trait;

/// Backend for storing deployment records.
///
/// Records are never deleted. Every successful `update` bumps `version` and
/// assigns `updated_at`; a record whose version no longer matches the stored
/// one is rejected without writing anything.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Insert a new record. Fails if the id or request id is already taken.
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>, StoreError>;

    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<DeploymentRecord>, StoreError>;

    /// Save `record` if its version is current. Returns the record as stored.
    async fn update(&self, record: &DeploymentRecord) -> Result<DeploymentRecord, StoreError>;
}

/// Errors from deployment stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("deployment {0} not found")]
    NotFound(DeploymentId),

    #[error("deployment {id} was modified concurrently (expected version {expected_version})")]
    Conflict {
        id: DeploymentId,
        expected_version: i64,
    },

    #[error("deployment {0} already exists")]
    DuplicateId(DeploymentId),

    #[error("request id {0} is already assigned to another deployment")]
    DuplicateRequestId(RequestId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt deployment row: {0}")]
    Serialisation(String),
}
