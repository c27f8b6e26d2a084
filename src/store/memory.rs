// ABOUTME: In-memory deployment store for tests and throwaway runs.
// ABOUTME: Same version and uniqueness rules as the SQLite store.

use super::{DeploymentStore, StoreError};
use crate::saga::DeploymentRecord;
use crate::types::{DeploymentId, RequestId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<DeploymentId, DeploymentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn request_id_taken(
    records: &HashMap<DeploymentId, DeploymentRecord>,
    owner: &DeploymentId,
    request_id: Option<&RequestId>,
) -> Option<RequestId> {
    let request_id = request_id?;
    records
        .values()
        .any(|r| r.id() != owner && r.request_id() == Some(request_id))
        .then(|| request_id.clone())
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(record.id()) {
            return Err(StoreError::DuplicateId(record.id().clone()));
        }
        if let Some(taken) = request_id_taken(&records, record.id(), record.request_id()) {
            return Err(StoreError::DuplicateRequestId(taken));
        }

        records.insert(record.id().clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.request_id() == Some(request_id))
            .cloned())
    }

    async fn update(&self, record: &DeploymentRecord) -> Result<DeploymentRecord, StoreError> {
        let mut records = self.records.write();
        let stored = records
            .get(record.id())
            .ok_or_else(|| StoreError::NotFound(record.id().clone()))?;

        if stored.version() != record.version() {
            return Err(StoreError::Conflict {
                id: record.id().clone(),
                expected_version: record.version(),
            });
        }
        if let Some(taken) = request_id_taken(&records, record.id(), record.request_id()) {
            return Err(StoreError::DuplicateRequestId(taken));
        }

        let mut saved = record.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        records.insert(saved.id().clone(), saved.clone());
        Ok(saved)
    }
}
