// ABOUTME: Saga states and the events that move a deployment between them.
// ABOUTME: Both serialize in SCREAMING_SNAKE_CASE for the store and the API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where a deployment saga currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Initial,
    Authenticated,
    DeployRequested,
    ApprovalPending,
    HashRetrieved,
    HashSigned,
    DeploymentApproved,
    Deployed,
    WhitelistRequested,
    WhitelistHashRetrieved,
    WhitelistHashSigned,
    WhitelistApproved,
    TokenRegistered,
    Completed,
    Error,
    Cancelled,
}

impl DeploymentState {
    /// Every state, happy path first.
    pub const ALL: [DeploymentState; 16] = [
        Self::Initial,
        Self::Authenticated,
        Self::DeployRequested,
        Self::ApprovalPending,
        Self::HashRetrieved,
        Self::HashSigned,
        Self::DeploymentApproved,
        Self::Deployed,
        Self::WhitelistRequested,
        Self::WhitelistHashRetrieved,
        Self::WhitelistHashSigned,
        Self::WhitelistApproved,
        Self::TokenRegistered,
        Self::Completed,
        Self::Error,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Authenticated => "AUTHENTICATED",
            Self::DeployRequested => "DEPLOY_REQUESTED",
            Self::ApprovalPending => "APPROVAL_PENDING",
            Self::HashRetrieved => "HASH_RETRIEVED",
            Self::HashSigned => "HASH_SIGNED",
            Self::DeploymentApproved => "DEPLOYMENT_APPROVED",
            Self::Deployed => "DEPLOYED",
            Self::WhitelistRequested => "WHITELIST_REQUESTED",
            Self::WhitelistHashRetrieved => "WHITELIST_HASH_RETRIEVED",
            Self::WhitelistHashSigned => "WHITELIST_HASH_SIGNED",
            Self::WhitelistApproved => "WHITELIST_APPROVED",
            Self::TokenRegistered => "TOKEN_REGISTERED",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states absorb every event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown deployment state: {0}")]
pub struct UnknownState(pub String);

/// Something that happened to a saga and may move it to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentEvent {
    AuthenticationSuccess,
    DeploymentRequestSuccess,
    RequestApproval,
    HashFetched,
    HashSigned,
    DeploymentApproved,
    DeploymentCompleted,
    RequestWhitelist,
    WhitelistHashFetched,
    WhitelistHashSigned,
    WhitelistApproved,
    TokenRegistered,
    RegisterToken,
    ErrorOccurred,
    Cancel,
}

impl DeploymentEvent {
    pub const ALL: [DeploymentEvent; 15] = [
        Self::AuthenticationSuccess,
        Self::DeploymentRequestSuccess,
        Self::RequestApproval,
        Self::HashFetched,
        Self::HashSigned,
        Self::DeploymentApproved,
        Self::DeploymentCompleted,
        Self::RequestWhitelist,
        Self::WhitelistHashFetched,
        Self::WhitelistHashSigned,
        Self::WhitelistApproved,
        Self::TokenRegistered,
        Self::RegisterToken,
        Self::ErrorOccurred,
        Self::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "AUTHENTICATION_SUCCESS",
            Self::DeploymentRequestSuccess => "DEPLOYMENT_REQUEST_SUCCESS",
            Self::RequestApproval => "REQUEST_APPROVAL",
            Self::HashFetched => "HASH_FETCHED",
            Self::HashSigned => "HASH_SIGNED",
            Self::DeploymentApproved => "DEPLOYMENT_APPROVED",
            Self::DeploymentCompleted => "DEPLOYMENT_COMPLETED",
            Self::RequestWhitelist => "REQUEST_WHITELIST",
            Self::WhitelistHashFetched => "WHITELIST_HASH_FETCHED",
            Self::WhitelistHashSigned => "WHITELIST_HASH_SIGNED",
            Self::WhitelistApproved => "WHITELIST_APPROVED",
            Self::TokenRegistered => "TOKEN_REGISTERED",
            Self::RegisterToken => "REGISTER_TOKEN",
            Self::ErrorOccurred => "ERROR_OCCURRED",
            Self::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for DeploymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
