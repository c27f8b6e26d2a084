// ABOUTME: Token registry trait for recording deployed contracts.
// ABOUTME: Registration may be declined without being an error.

use async_trait::async_trait;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register a deployed contract. `Ok(false)` means the registry declined.
    async fn register(
        &self,
        contract_address: &str,
        metadata: &serde_json::Value,
    ) -> Result<bool, RegistryError>;
}

/// Errors from the token registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("token registry returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("token registry unreachable: {0}")]
    Transport(String),
}
