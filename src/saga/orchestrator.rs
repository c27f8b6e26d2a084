// ABOUTME: Drives one deployment saga through a step group per inbound operation.
// ABOUTME: Persists after every side effect; any mid-sequence failure parks the saga in ERROR.

use super::error::{Operation, SagaError};
use super::record::{DeploymentRecord, NewDeployment};
use super::state::{DeploymentEvent, DeploymentState};
use super::transitions;
use crate::clients::{CustodyClient, RegistryClient, SigningClient, metadata_text};
use crate::store::{DeploymentStore, StoreError};
use crate::types::{AuthToken, RequestId, WhitelistId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates the custody platform, the signer, and the registry for each saga.
///
/// Holds no per-saga state: every operation loads the record, checks that its
/// state permits the operation, and then walks the step group in order.
pub struct SagaOrchestrator {
    store: Arc<dyn DeploymentStore>,
    custody: Arc<dyn CustodyClient>,
    signer: Arc<dyn SigningClient>,
    registry: Arc<dyn RegistryClient>,
    call_timeout: Duration,
}

impl SagaOrchestrator {
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        custody: Arc<dyn CustodyClient>,
        signer: Arc<dyn SigningClient>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        Self {
            store,
            custody,
            signer,
            registry,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    /// Create a saga, authenticate, and submit the deploy request.
    ///
    /// Invalid input is rejected before anything is stored. Once the record
    /// exists, any failure leaves it in `ERROR` and returns `Aborted`.
    pub async fn initiate_deployment(
        &self,
        input: NewDeployment,
    ) -> Result<DeploymentRecord, SagaError> {
        let mut record = DeploymentRecord::create(input)?;
        self.store.insert(&record).await?;

        tracing::info!(
            deployment_id = %record.id(),
            contract = record.contract_name(),
            "deployment saga created"
        );

        match self.run_initiate(&mut record).await {
            Ok(()) => Ok(record),
            Err(err) => Err(self.abort(record, Operation::Initiate, err).await),
        }
    }

    async fn run_initiate(&self, record: &mut DeploymentRecord) -> Result<(), SagaError> {
        let token = self
            .call("authenticate", self.custody.authenticate())
            .await?;
        record.set_auth_token(token.clone());
        self.fire(record, DeploymentEvent::AuthenticationSuccess)
            .await?;

        let request_id = self
            .call(
                "request deployment",
                self.custody.request_deployment(
                    &token,
                    record.contract_bytecode(),
                    record.contract_name(),
                    record.constructor_args(),
                ),
            )
            .await?;
        record.set_request_id(request_id)?;
        self.fire(record, DeploymentEvent::DeploymentRequestSuccess)
            .await
    }

    /// Fetch, sign, and approve the deployment hash, then poll once for the result.
    pub async fn approve_deployment(
        &self,
        request_id: &RequestId,
    ) -> Result<DeploymentRecord, SagaError> {
        let mut record = self.load(request_id).await?;
        require_state(&record, DeploymentState::DeployRequested, Operation::Approve)?;
        let token = stored_token(&record)?;

        match self.run_approve(&mut record, &token, request_id).await {
            Ok(()) => Ok(record),
            Err(err) => Err(self.abort(record, Operation::Approve, err).await),
        }
    }

    async fn run_approve(
        &self,
        record: &mut DeploymentRecord,
        token: &AuthToken,
        request_id: &RequestId,
    ) -> Result<(), SagaError> {
        self.fire(record, DeploymentEvent::RequestApproval).await?;

        let details = self
            .call(
                "fetch request details",
                self.custody.get_request_details(token, request_id),
            )
            .await?;
        record.set_hash_value(details.hash.clone())?;
        self.fire(record, DeploymentEvent::HashFetched).await?;

        let signature = self
            .call(
                "sign approval hash",
                self.signer
                    .sign(&details.hash, &metadata_text(&details.metadata)),
            )
            .await?;
        record.set_signed_hash(signature.clone())?;
        self.fire(record, DeploymentEvent::HashSigned).await?;

        self.call(
            "approve request",
            self.custody.approve(token, request_id, &signature),
        )
        .await?;
        self.fire(record, DeploymentEvent::DeploymentApproved)
            .await?;

        self.poll_deployment(record, token, request_id).await
    }

    /// Run the whitelist sub-protocol and register the token.
    ///
    /// From `WHITELIST_APPROVED` only the registration is retried. A declined
    /// registration leaves the saga in `WHITELIST_APPROVED`.
    pub async fn whitelist_contract(
        &self,
        request_id: &RequestId,
    ) -> Result<DeploymentRecord, SagaError> {
        let mut record = self.load(request_id).await?;

        match record.state() {
            DeploymentState::Deployed => {
                let token = stored_token(&record)?;
                if record.whitelist_id().is_none() || record.contract_address().is_none() {
                    if let Err(err) = self
                        .refresh_deployment_details(&mut record, &token, request_id)
                        .await
                    {
                        return Err(self.abort(record, Operation::Whitelist, err).await);
                    }
                }

                // Nothing is persisted until the whitelist request fires.
                let Some(whitelist_id) = record.whitelist_id().cloned() else {
                    return Err(SagaError::MissingWhitelistId(request_id.clone()));
                };
                if record.contract_address().is_none() {
                    return Err(SagaError::MissingContractAddress(request_id.clone()));
                }

                match self.run_whitelist(&mut record, &token, whitelist_id).await {
                    Ok(()) => Ok(record),
                    Err(err) => Err(self.abort(record, Operation::Whitelist, err).await),
                }
            }
            DeploymentState::WhitelistApproved => {
                tracing::info!(
                    deployment_id = %record.id(),
                    request_id = %request_id,
                    "resuming stalled token registration"
                );
                match self.register_token(&mut record).await {
                    Ok(()) => Ok(record),
                    Err(err) => Err(self.abort(record, Operation::Whitelist, err).await),
                }
            }
            state => Err(SagaError::InvalidState {
                state,
                operation: Operation::Whitelist,
            }),
        }
    }

    /// Fill in the whitelist id and contract address the deployment poll did not report.
    async fn refresh_deployment_details(
        &self,
        record: &mut DeploymentRecord,
        token: &AuthToken,
        request_id: &RequestId,
    ) -> Result<(), SagaError> {
        tracing::debug!(
            deployment_id = %record.id(),
            request_id = %request_id,
            "deployment details incomplete, refreshing from custody"
        );
        let details = self
            .call(
                "fetch request details",
                self.custody.get_request_details(token, request_id),
            )
            .await?;

        if record.contract_address().is_none() {
            if let Some(address) = details.contract_address {
                record.set_contract_address(address)?;
            }
        }
        if record.whitelist_id().is_none() {
            if let Some(id) = details.whitelist_id {
                record.set_whitelist_id(id)?;
            }
        }
        Ok(())
    }

    async fn run_whitelist(
        &self,
        record: &mut DeploymentRecord,
        token: &AuthToken,
        whitelist_id: WhitelistId,
    ) -> Result<(), SagaError> {
        record.set_whitelist_id(whitelist_id.clone())?;
        self.fire(record, DeploymentEvent::RequestWhitelist).await?;

        let details = self
            .call(
                "fetch whitelist details",
                self.custody.get_whitelist_details(token, &whitelist_id),
            )
            .await?;
        record.set_whitelist_hash(details.hash.clone())?;
        self.fire(record, DeploymentEvent::WhitelistHashFetched)
            .await?;

        let signature = self
            .call(
                "sign whitelist hash",
                self.signer
                    .sign(&details.hash, &metadata_text(&details.metadata)),
            )
            .await?;
        record.set_signed_whitelist_hash(signature.clone())?;
        self.fire(record, DeploymentEvent::WhitelistHashSigned)
            .await?;

        self.call(
            "approve whitelist",
            self.custody
                .approve_whitelist(token, &whitelist_id, &signature),
        )
        .await?;
        self.fire(record, DeploymentEvent::WhitelistApproved)
            .await?;

        self.register_token(record).await
    }

    async fn register_token(&self, record: &mut DeploymentRecord) -> Result<(), SagaError> {
        let address = record
            .contract_address()
            .ok_or(SagaError::MissingArtifact("contract address"))?
            .to_string();
        let metadata = serde_json::json!({ "name": record.contract_name() });

        let registered = self
            .call("register token", self.registry.register(&address, &metadata))
            .await?;

        if !registered {
            tracing::warn!(
                deployment_id = %record.id(),
                contract_address = %address,
                "token registry declined registration, saga stays in WHITELIST_APPROVED"
            );
            return Ok(());
        }

        self.fire(record, DeploymentEvent::TokenRegistered).await?;
        self.fire(record, DeploymentEvent::RegisterToken).await
    }

    /// Current view of a saga. Only `DEPLOYMENT_APPROVED` triggers a poll;
    /// poll failures are logged and the stored record is returned as is.
    pub async fn deployment_status(
        &self,
        request_id: &RequestId,
    ) -> Result<DeploymentRecord, SagaError> {
        let record = self.load(request_id).await?;
        if record.state() != DeploymentState::DeploymentApproved {
            return Ok(record);
        }

        let token = match stored_token(&record) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(deployment_id = %record.id(), error = %err, "cannot poll deployment");
                return Ok(record);
            }
        };

        let mut polled = record.clone();
        match self.poll_deployment(&mut polled, &token, request_id).await {
            Ok(()) => Ok(polled),
            Err(err) => {
                tracing::warn!(
                    deployment_id = %record.id(),
                    request_id = %request_id,
                    error = %err,
                    "deployment status poll failed"
                );
                Ok(record)
            }
        }
    }

    /// Ask custody whether the approved deployment has landed on chain.
    async fn poll_deployment(
        &self,
        record: &mut DeploymentRecord,
        token: &AuthToken,
        request_id: &RequestId,
    ) -> Result<(), SagaError> {
        let details = self
            .call(
                "poll deployment status",
                self.custody.get_request_details(token, request_id),
            )
            .await?;

        if !details.is_deployed() {
            tracing::debug!(
                deployment_id = %record.id(),
                status = %details.status,
                "contract not deployed yet"
            );
            return Ok(());
        }

        if let Some(address) = details.contract_address {
            record.set_contract_address(address)?;
        }
        if let Some(hash) = details.transaction_hash {
            record.set_transaction_hash(hash)?;
        }
        if let Some(id) = details.whitelist_id {
            record.set_whitelist_id(id)?;
        }
        self.fire(record, DeploymentEvent::DeploymentCompleted)
            .await
    }

    /// Cancel a saga that has not yet been deployed. No collaborator is called.
    pub async fn cancel_deployment(
        &self,
        request_id: &RequestId,
    ) -> Result<DeploymentRecord, SagaError> {
        let mut record = self.load(request_id).await?;
        if !transitions::permits(record.state(), DeploymentEvent::Cancel) {
            return Err(SagaError::InvalidState {
                state: record.state(),
                operation: Operation::Cancel,
            });
        }

        self.fire(&mut record, DeploymentEvent::Cancel).await?;
        Ok(record)
    }

    async fn load(&self, request_id: &RequestId) -> Result<DeploymentRecord, SagaError> {
        self.store
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| SagaError::NotFound(request_id.clone()))
    }

    /// Apply `event` and persist the record together with any pending artifacts.
    async fn fire(
        &self,
        record: &mut DeploymentRecord,
        event: DeploymentEvent,
    ) -> Result<(), SagaError> {
        let from = record.state();
        let to = record.fire(event)?;
        self.persist(record).await?;

        tracing::info!(
            deployment_id = %record.id(),
            request_id = record.request_id().map(RequestId::as_str),
            %from,
            %to,
            %event,
            "saga transition"
        );
        Ok(())
    }

    async fn persist(&self, record: &mut DeploymentRecord) -> Result<(), SagaError> {
        *record = self.store.update(record).await?;
        Ok(())
    }

    /// Bound a collaborator call by the configured timeout.
    async fn call<T, E, F>(&self, step: &'static str, fut: F) -> Result<T, SagaError>
    where
        F: Future<Output = Result<T, E>>,
        SagaError: From<E>,
    {
        tracing::debug!(step, "calling collaborator");
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result.map_err(SagaError::from),
            Err(_) => Err(SagaError::Timeout {
                step,
                after: self.call_timeout,
            }),
        }
    }

    /// Park the saga in `ERROR` and wrap the cause for the caller.
    ///
    /// The failure is recorded on the last persisted copy, so artifacts that
    /// never reached the store are not written alongside it. If that copy
    /// cannot be reloaded, or a concurrent writer won, nothing is written.
    async fn abort(
        &self,
        record: DeploymentRecord,
        operation: Operation,
        err: SagaError,
    ) -> SagaError {
        tracing::error!(
            deployment_id = %record.id(),
            state = %record.state(),
            %operation,
            error = %err,
            "saga step failed"
        );

        let deployment_id = record.id().clone();
        if matches!(err, SagaError::Store(StoreError::Conflict { .. })) {
            tracing::warn!(
                deployment_id = %deployment_id,
                "saga changed concurrently, leaving the stored record as is"
            );
        } else {
            match self.store.get(&deployment_id).await {
                Ok(Some(mut latest)) => {
                    if latest.fail(format!("failed to {operation}: {err}")) {
                        if let Err(persist_err) = self.persist(&mut latest).await {
                            tracing::error!(
                                deployment_id = %deployment_id,
                                error = %persist_err,
                                "could not record saga failure"
                            );
                        }
                    }
                }
                Ok(None) => tracing::error!(
                    deployment_id = %deployment_id,
                    "saga record disappeared, failure not recorded"
                ),
                Err(get_err) => tracing::error!(
                    deployment_id = %deployment_id,
                    error = %get_err,
                    "could not reload saga, failure not recorded"
                ),
            }
        }

        SagaError::Aborted {
            deployment_id,
            operation,
            source: Box::new(err),
        }
    }
}

fn require_state(
    record: &DeploymentRecord,
    expected: DeploymentState,
    operation: Operation,
) -> Result<(), SagaError> {
    if record.state() == expected {
        Ok(())
    } else {
        Err(SagaError::InvalidState {
            state: record.state(),
            operation,
        })
    }
}

fn stored_token(record: &DeploymentRecord) -> Result<AuthToken, SagaError> {
    record
        .auth_token()
        .cloned()
        .ok_or(SagaError::MissingArtifact("auth token"))
}
