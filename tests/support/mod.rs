// ABOUTME: Test support utilities.
// ABOUTME: Scripted mock collaborators, a state-recording store, and a saga harness.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use consign::clients::{
    CustodyClient, CustodyError, RegistryClient, RegistryError, RequestDetails, SigningClient,
    SigningError, WhitelistDetails,
};
use consign::saga::{DeploymentRecord, DeploymentState, NewDeployment, SagaOrchestrator};
use consign::store::{DeploymentStore, MemoryStore, StoreError};
use consign::types::{AuthToken, DeploymentId, RequestId, WhitelistId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::Notify;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("consign=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn token_a() -> NewDeployment {
    NewDeployment {
        contract_name: "TokenA".to_string(),
        contract_bytecode: "0x6000".to_string(),
        constructor_args: Some(String::new()),
        ..Default::default()
    }
}

// =============================================================================
// Custody
// =============================================================================

/// Scripted custody platform. Every call is recorded by method name.
pub struct MockCustody {
    pub token: Mutex<String>,
    pub request_ids: Mutex<VecDeque<String>>,
    pub hash: Mutex<String>,
    pub metadata: Mutex<serde_json::Value>,
    pub status: Mutex<String>,
    pub contract_address: Mutex<Option<String>>,
    pub transaction_hash: Mutex<Option<String>>,
    pub whitelist_id: Mutex<Option<String>>,
    pub whitelist_hash: Mutex<String>,
    pub failing: Mutex<HashSet<&'static str>>,
    pub hanging: Mutex<HashSet<&'static str>>,
    pub failing_after: Mutex<HashMap<&'static str, usize>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub approvals: Mutex<Vec<(String, String)>>,
    pub whitelist_approvals: Mutex<Vec<(String, String)>>,
    next_request: Mutex<u32>,
}

impl Default for MockCustody {
    fn default() -> Self {
        Self {
            token: Mutex::new("tok-1".to_string()),
            request_ids: Mutex::new(VecDeque::new()),
            hash: Mutex::new("h1".to_string()),
            metadata: Mutex::new(serde_json::json!({})),
            status: Mutex::new("deployed".to_string()),
            contract_address: Mutex::new(Some("0xAA".to_string())),
            transaction_hash: Mutex::new(Some("0xBB".to_string())),
            whitelist_id: Mutex::new(Some("WL-1".to_string())),
            whitelist_hash: Mutex::new("wh1".to_string()),
            failing: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
            failing_after: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            approvals: Mutex::new(Vec::new()),
            whitelist_approvals: Mutex::new(Vec::new()),
            next_request: Mutex::new(1),
        }
    }
}

impl MockCustody {
    pub fn fail_on(&self, method: &'static str) {
        self.failing.lock().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.failing.lock().remove(method);
    }

    /// Let `method` succeed `n` times, then fail every later call.
    pub fn fail_after(&self, method: &'static str, n: usize) {
        self.failing_after.lock().insert(method, n);
    }

    pub fn hang_on(&self, method: &'static str) {
        self.hanging.lock().insert(method);
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock() = status.to_string();
    }

    pub fn set_whitelist_id(&self, id: Option<&str>) {
        *self.whitelist_id.lock() = id.map(str::to_string);
    }

    pub fn script_request_ids(&self, ids: &[&str]) {
        self.request_ids
            .lock()
            .extend(ids.iter().map(|s| s.to_string()));
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|m| **m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn enter(&self, method: &'static str) -> Result<(), CustodyError> {
        self.calls.lock().push(method);
        let hang = self.hanging.lock().contains(method);
        if hang {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        let exhausted = self
            .failing_after
            .lock()
            .get(method)
            .is_some_and(|n| self.count(method) > *n);
        if exhausted || self.failing.lock().contains(method) {
            return Err(CustodyError::Status {
                status: 500,
                message: format!("{method} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CustodyClient for MockCustody {
    async fn authenticate(&self) -> Result<AuthToken, CustodyError> {
        self.enter("authenticate").await?;
        Ok(AuthToken::new(self.token.lock().clone()))
    }

    async fn request_deployment(
        &self,
        _token: &AuthToken,
        _bytecode: &str,
        _name: &str,
        _constructor_args: Option<&str>,
    ) -> Result<RequestId, CustodyError> {
        self.enter("request_deployment").await?;
        let scripted = self.request_ids.lock().pop_front();
        let id = scripted.unwrap_or_else(|| {
            let mut next = self.next_request.lock();
            let id = format!("DEP-{}", *next);
            *next += 1;
            id
        });
        Ok(RequestId::new(id))
    }

    async fn get_request_details(
        &self,
        _token: &AuthToken,
        _request_id: &RequestId,
    ) -> Result<RequestDetails, CustodyError> {
        self.enter("get_request_details").await?;
        Ok(RequestDetails {
            hash: self.hash.lock().clone(),
            metadata: self.metadata.lock().clone(),
            status: self.status.lock().clone(),
            contract_address: self.contract_address.lock().clone(),
            transaction_hash: self.transaction_hash.lock().clone(),
            whitelist_id: self.whitelist_id.lock().clone().map(WhitelistId::new),
        })
    }

    async fn approve(
        &self,
        _token: &AuthToken,
        request_id: &RequestId,
        signature: &str,
    ) -> Result<(), CustodyError> {
        self.enter("approve").await?;
        self.approvals
            .lock()
            .push((request_id.to_string(), signature.to_string()));
        Ok(())
    }

    async fn get_whitelist_details(
        &self,
        _token: &AuthToken,
        _whitelist_id: &WhitelistId,
    ) -> Result<WhitelistDetails, CustodyError> {
        self.enter("get_whitelist_details").await?;
        Ok(WhitelistDetails {
            hash: self.whitelist_hash.lock().clone(),
            metadata: serde_json::json!({"kind": "whitelist"}),
        })
    }

    async fn approve_whitelist(
        &self,
        _token: &AuthToken,
        whitelist_id: &WhitelistId,
        signature: &str,
    ) -> Result<(), CustodyError> {
        self.enter("approve_whitelist").await?;
        self.whitelist_approvals
            .lock()
            .push((whitelist_id.to_string(), signature.to_string()));
        Ok(())
    }
}

// =============================================================================
// Signing and registry
// =============================================================================

/// Signs `hash` as `sig-{hash}`.
///
/// When held, each call signals `entered` and then waits for `release`.
#[derive(Default)]
pub struct MockSigner {
    pub failing: Mutex<bool>,
    pub held: Mutex<bool>,
    pub entered: Notify,
    pub release: Notify,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockSigner {
    pub fn fail(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn hold(&self, held: bool) {
        *self.held.lock() = held;
    }
}

#[async_trait]
impl SigningClient for MockSigner {
    async fn sign(&self, hash: &str, metadata: &str) -> Result<String, SigningError> {
        self.calls
            .lock()
            .push((hash.to_string(), metadata.to_string()));
        let held = *self.held.lock();
        if held {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if *self.failing.lock() {
            return Err(SigningError::Transport("signer offline".to_string()));
        }
        Ok(format!("sig-{hash}"))
    }
}

pub struct MockRegistry {
    pub registered: Mutex<bool>,
    pub failing: Mutex<bool>,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self {
            registered: Mutex::new(true),
            failing: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRegistry {
    pub fn accept(&self, registered: bool) {
        *self.registered.lock() = registered;
    }
}

#[async_trait]
impl RegistryClient for MockRegistry {
    async fn register(
        &self,
        contract_address: &str,
        metadata: &serde_json::Value,
    ) -> Result<bool, RegistryError> {
        self.calls
            .lock()
            .push((contract_address.to_string(), metadata.clone()));
        if *self.failing.lock() {
            return Err(RegistryError::Status {
                status: 503,
                message: "registry down".to_string(),
            });
        }
        Ok(*self.registered.lock())
    }
}

// =============================================================================
// Store wrapper and harness
// =============================================================================

/// Delegating store that remembers every state it was asked to persist.
pub struct RecordingStore {
    inner: Arc<dyn DeploymentStore>,
    pub states: Mutex<Vec<DeploymentState>>,
    pub failing_gets: Mutex<bool>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn DeploymentStore>) -> Self {
        Self {
            inner,
            states: Mutex::new(Vec::new()),
            failing_gets: Mutex::new(false),
        }
    }

    /// Make lookups by internal id fail; request-id lookups still work.
    pub fn fail_gets(&self, failing: bool) {
        *self.failing_gets.lock() = failing;
    }
}

#[async_trait]
impl DeploymentStore for RecordingStore {
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), StoreError> {
        self.inner.insert(record).await?;
        self.states.lock().push(record.state());
        Ok(())
    }

    async fn get(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>, StoreError> {
        if *self.failing_gets.lock() {
            return Err(StoreError::Serialisation("store offline".to_string()));
        }
        self.inner.get(id).await
    }

    async fn find_by_request_id(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<DeploymentRecord>, StoreError> {
        self.inner.find_by_request_id(request_id).await
    }

    async fn update(&self, record: &DeploymentRecord) -> Result<DeploymentRecord, StoreError> {
        let saved = self.inner.update(record).await?;
        self.states.lock().push(saved.state());
        Ok(saved)
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub custody: Arc<MockCustody>,
    pub signer: Arc<MockSigner>,
    pub registry: Arc<MockRegistry>,
    pub saga: Arc<SagaOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), timeout)
    }

    pub fn with_store(inner: Arc<dyn DeploymentStore>, timeout: Duration) -> Self {
        init_tracing();
        let store = Arc::new(RecordingStore::new(inner));
        let custody = Arc::new(MockCustody::default());
        let signer = Arc::new(MockSigner::default());
        let registry = Arc::new(MockRegistry::default());

        let saga = SagaOrchestrator::new(
            store.clone(),
            custody.clone(),
            signer.clone(),
            registry.clone(),
        )
        .with_call_timeout(timeout);

        Self {
            store,
            custody,
            signer,
            registry,
            saga: Arc::new(saga),
        }
    }

    /// Collaborator calls made so far, across all three services.
    pub fn total_calls(&self) -> usize {
        self.custody.total_calls() + self.signer.calls.lock().len() + self.registry.calls.lock().len()
    }

    pub fn states(&self) -> Vec<DeploymentState> {
        self.store.states.lock().clone()
    }

    pub async fn stored(&self, request_id: &str) -> DeploymentRecord {
        self.store
            .find_by_request_id(&RequestId::new(request_id))
            .await
            .unwrap()
            .expect("record should exist")
    }

    /// Initiate and approve a deployment, leaving it in DEPLOYED.
    pub async fn deployed(&self) -> RequestId {
        let record = self.saga.initiate_deployment(token_a()).await.unwrap();
        let request_id = record.request_id().unwrap().clone();
        let record = self.saga.approve_deployment(&request_id).await.unwrap();
        assert_eq!(record.state(), DeploymentState::Deployed);
        request_id
    }
}
