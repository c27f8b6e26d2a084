// ABOUTME: Durable per-request deployment entity and its creation input.
// ABOUTME: Artifacts are write-once; state only moves through the transition table.

use super::state::{DeploymentEvent, DeploymentState};
use super::transitions::{self, InvalidTransition};
use crate::types::{AuthToken, ContractName, ContractNameError, DeploymentId, RequestId, WhitelistId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Caller-supplied input for a new deployment saga.
#[derive(Debug, Clone, Default)]
pub struct NewDeployment {
    pub contract_name: String,
    pub contract_bytecode: String,
    pub constructor_args: Option<String>,
    pub network: Option<String>,
    pub requester_id: Option<String>,
}

/// Input rejected before any record is created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    ContractName(#[from] ContractNameError),

    #[error("contract bytecode is required")]
    EmptyBytecode,
}

/// An artifact slot that already holds a different value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{artifact} is already set and cannot be overwritten")]
pub struct ArtifactAlreadySet {
    pub artifact: &'static str,
}

/// One deployment saga as persisted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub(crate) id: DeploymentId,
    pub(crate) request_id: Option<RequestId>,
    pub(crate) auth_token: Option<AuthToken>,
    pub(crate) contract_name: String,
    pub(crate) contract_bytecode: String,
    pub(crate) constructor_args: Option<String>,
    pub(crate) network: Option<String>,
    pub(crate) requester_id: Option<String>,
    pub(crate) hash_value: Option<String>,
    pub(crate) signed_hash: Option<String>,
    pub(crate) transaction_hash: Option<String>,
    pub(crate) contract_address: Option<String>,
    pub(crate) whitelist_id: Option<WhitelistId>,
    pub(crate) whitelist_hash: Option<String>,
    pub(crate) signed_whitelist_hash: Option<String>,
    pub(crate) state: DeploymentState,
    pub(crate) error_message: Option<String>,
    pub(crate) version: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Validate the input and build a fresh record in `INITIAL`.
    pub fn create(input: NewDeployment) -> Result<Self, ValidationError> {
        let name = ContractName::new(&input.contract_name)?;
        let bytecode = input.contract_bytecode.trim();
        if bytecode.is_empty() {
            return Err(ValidationError::EmptyBytecode);
        }

        let now = Utc::now();
        Ok(Self {
            id: DeploymentId::generate(),
            request_id: None,
            auth_token: None,
            contract_name: name.as_str().to_string(),
            contract_bytecode: bytecode.to_string(),
            constructor_args: non_blank(input.constructor_args),
            network: non_blank(input.network),
            requester_id: non_blank(input.requester_id),
            hash_value: None,
            signed_hash: None,
            transaction_hash: None,
            contract_address: None,
            whitelist_id: None,
            whitelist_hash: None,
            signed_whitelist_hash: None,
            state: DeploymentState::Initial,
            error_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &DeploymentId {
        &self.id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn auth_token(&self) -> Option<&AuthToken> {
        self.auth_token.as_ref()
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn contract_bytecode(&self) -> &str {
        &self.contract_bytecode
    }

    pub fn constructor_args(&self) -> Option<&str> {
        self.constructor_args.as_deref()
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn requester_id(&self) -> Option<&str> {
        self.requester_id.as_deref()
    }

    pub fn hash_value(&self) -> Option<&str> {
        self.hash_value.as_deref()
    }

    pub fn signed_hash(&self) -> Option<&str> {
        self.signed_hash.as_deref()
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction_hash.as_deref()
    }

    pub fn contract_address(&self) -> Option<&str> {
        self.contract_address.as_deref()
    }

    pub fn whitelist_id(&self) -> Option<&WhitelistId> {
        self.whitelist_id.as_ref()
    }

    pub fn whitelist_hash(&self) -> Option<&str> {
        self.whitelist_hash.as_deref()
    }

    pub fn signed_whitelist_hash(&self) -> Option<&str> {
        self.signed_whitelist_hash.as_deref()
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fire `event` against the current state. On rejection the record is untouched.
    pub(crate) fn fire(&mut self, event: DeploymentEvent) -> Result<DeploymentState, InvalidTransition> {
        let next = transitions::apply(self.state, event)?;
        self.state = next;
        Ok(next)
    }

    /// Move to `ERROR` with a message. Returns false if the record is already terminal.
    pub(crate) fn fail(&mut self, message: String) -> bool {
        match self.fire(DeploymentEvent::ErrorOccurred) {
            Ok(_) => {
                self.error_message = Some(message);
                true
            }
            Err(_) => false,
        }
    }

    /// Fresh credentials replace whatever was stored before.
    pub(crate) fn set_auth_token(&mut self, token: AuthToken) {
        self.auth_token = Some(token);
    }

    pub(crate) fn set_request_id(&mut self, id: RequestId) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.request_id, id, "request id")
    }

    pub(crate) fn set_hash_value(&mut self, hash: String) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.hash_value, hash, "approval hash")
    }

    pub(crate) fn set_signed_hash(&mut self, signature: String) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.signed_hash, signature, "signed hash")
    }

    pub(crate) fn set_transaction_hash(&mut self, hash: String) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.transaction_hash, hash, "transaction hash")
    }

    pub(crate) fn set_contract_address(&mut self, address: String) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.contract_address, address, "contract address")
    }

    pub(crate) fn set_whitelist_id(&mut self, id: WhitelistId) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.whitelist_id, id, "whitelist id")
    }

    pub(crate) fn set_whitelist_hash(&mut self, hash: String) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.whitelist_hash, hash, "whitelist hash")
    }

    pub(crate) fn set_signed_whitelist_hash(
        &mut self,
        signature: String,
    ) -> Result<(), ArtifactAlreadySet> {
        set_once(&mut self.signed_whitelist_hash, signature, "signed whitelist hash")
    }
}

/// Writing the value already held is a no-op; writing a different one is rejected.
fn set_once<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    artifact: &'static str,
) -> Result<(), ArtifactAlreadySet> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(ArtifactAlreadySet { artifact }),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
