// ABOUTME: Custody platform trait: authentication, deploy requests, approvals, whitelists.
// ABOUTME: The platform holds signing keys and gates every action behind a signed hash.

use crate::types::{AuthToken, RequestId, WhitelistId};
use async_trait::async_trait;

/// Operations against the custody/approval platform.
#[async_trait]
pub trait CustodyClient: Send + Sync {
    /// Obtain a fresh bearer token.
    async fn authenticate(&self) -> Result<AuthToken, CustodyError>;

    /// Ask the platform to deploy `bytecode`. Returns the platform's request id.
    async fn request_deployment(
        &self,
        token: &AuthToken,
        bytecode: &str,
        name: &str,
        constructor_args: Option<&str>,
    ) -> Result<RequestId, CustodyError>;

    /// Fetch the approval hash and on-chain status of a deploy request.
    async fn get_request_details(
        &self,
        token: &AuthToken,
        request_id: &RequestId,
    ) -> Result<RequestDetails, CustodyError>;

    /// Submit the signed approval hash for a deploy request.
    async fn approve(
        &self,
        token: &AuthToken,
        request_id: &RequestId,
        signature: &str,
    ) -> Result<(), CustodyError>;

    async fn get_whitelist_details(
        &self,
        token: &AuthToken,
        whitelist_id: &WhitelistId,
    ) -> Result<WhitelistDetails, CustodyError>;

    async fn approve_whitelist(
        &self,
        token: &AuthToken,
        whitelist_id: &WhitelistId,
        signature: &str,
    ) -> Result<(), CustodyError>;
}

/// A deploy request as reported by the custody platform.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDetails {
    pub hash: String,
    /// Opaque JSON the signer must see alongside the hash.
    pub metadata: serde_json::Value,
    pub status: String,
    pub contract_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub whitelist_id: Option<WhitelistId>,
}

impl RequestDetails {
    /// The platform reports `deployed` once the contract is on chain.
    pub fn is_deployed(&self) -> bool {
        self.status.eq_ignore_ascii_case("deployed")
    }
}

/// A whitelist entry awaiting approval.
#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistDetails {
    pub hash: String,
    pub metadata: serde_json::Value,
}

/// Render metadata the way the signer expects it: serialized JSON text,
/// with bare strings passed through unquoted.
pub fn metadata_text(metadata: &serde_json::Value) -> String {
    match metadata {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Errors from custody platform operations.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("custody platform rejected credentials")]
    Unauthorized,

    #[error("{kind} {id} not found on custody platform")]
    NotFound { kind: &'static str, id: String },

    #[error("custody platform returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("custody platform unreachable: {0}")]
    Transport(String),

    #[error("unexpected custody response: {0}")]
    InvalidResponse(String),
}
