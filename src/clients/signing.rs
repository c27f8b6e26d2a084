// ABOUTME: Hash-signing service trait.
// ABOUTME: Signing is an opaque remote call; no cryptography happens locally.

use async_trait::async_trait;

#[async_trait]
pub trait SigningClient: Send + Sync {
    /// Sign `hash`, with the platform metadata as context. Returns the signature.
    async fn sign(&self, hash: &str, metadata: &str) -> Result<String, SigningError>;
}

/// Errors from the signing service.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("signing service unreachable: {0}")]
    Transport(String),

    #[error("unexpected signing response: {0}")]
    InvalidResponse(String),
}
