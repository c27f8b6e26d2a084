// ABOUTME: Error types for saga operations and their caller-facing kinds.
// ABOUTME: Mid-sequence failures are wrapped in Aborted, carrying the deployment id.

use super::record::{ArtifactAlreadySet, ValidationError};
use super::state::DeploymentState;
use super::transitions::InvalidTransition;
use crate::clients::{CustodyError, RegistryError, SigningError};
use crate::store::StoreError;
use crate::types::{DeploymentId, RequestId};
use std::fmt;
use std::time::Duration;

/// The inbound operation a saga error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initiate,
    Approve,
    Whitelist,
    Status,
    Cancel,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initiate => "initiate deployment",
            Self::Approve => "approve deployment",
            Self::Whitelist => "whitelist contract",
            Self::Status => "fetch deployment status",
            Self::Cancel => "cancel deployment",
        })
    }
}

/// Broad category of a saga failure, used for HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaErrorKind {
    Validation,
    NotFound,
    InvalidState,
    Conflict,
    ExternalService,
    Persistence,
}

/// Errors returned by the saga orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum SagaError {
    #[error("invalid deployment request: {0}")]
    Validation(#[from] ValidationError),

    #[error("no deployment with request id {0}")]
    NotFound(RequestId),

    #[error("cannot {operation} while deployment is in state {state}")]
    InvalidState {
        state: DeploymentState,
        operation: Operation,
    },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error(transparent)]
    ArtifactAlreadySet(#[from] ArtifactAlreadySet),

    #[error("deployment is missing its {0}")]
    MissingArtifact(&'static str),

    #[error("custody platform has not assigned a whitelist id to request {0}")]
    MissingWhitelistId(RequestId),

    #[error("custody platform has not reported a contract address for request {0}")]
    MissingContractAddress(RequestId),

    #[error("custody call failed: {0}")]
    Custody(#[from] CustodyError),

    #[error("signing call failed: {0}")]
    Signing(#[from] SigningError),

    #[error("registry call failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("{step} timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    /// A step failed after the saga started; the record is now in `ERROR`.
    #[error("failed to {operation}: {source}")]
    Aborted {
        deployment_id: DeploymentId,
        operation: Operation,
        source: Box<SagaError>,
    },
}

impl SagaError {
    pub fn kind(&self) -> SagaErrorKind {
        match self {
            Self::Validation(_) => SagaErrorKind::Validation,
            Self::NotFound(_) => SagaErrorKind::NotFound,
            Self::InvalidState { .. }
            | Self::InvalidTransition(_)
            | Self::ArtifactAlreadySet(_)
            | Self::MissingArtifact(_)
            | Self::MissingWhitelistId(_)
            | Self::MissingContractAddress(_) => SagaErrorKind::InvalidState,
            Self::Custody(_) | Self::Signing(_) | Self::Registry(_) | Self::Timeout { .. } => {
                SagaErrorKind::ExternalService
            }
            Self::Store(StoreError::NotFound(_)) => SagaErrorKind::NotFound,
            Self::Store(StoreError::Conflict { .. } | StoreError::DuplicateRequestId(_)) => {
                SagaErrorKind::Conflict
            }
            Self::Store(_) => SagaErrorKind::Persistence,
            Self::Aborted { source, .. } => source.kind(),
        }
    }

    /// Internal id of the saga this error aborted, if any.
    pub fn deployment_id(&self) -> Option<&DeploymentId> {
        match self {
            Self::Aborted { deployment_id, .. } => Some(deployment_id),
            _ => None,
        }
    }
}
