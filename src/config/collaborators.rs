// ABOUTME: Endpoint and credential settings for the custody, signing, and registry services.
// ABOUTME: Endpoint paths default to the platform's standard routes.

use super::EnvValue;
use crate::error::Result;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustodyConfig {
    pub base_url: String,
    pub client_id: EnvValue,
    pub client_secret: EnvValue,
    #[serde(default)]
    pub endpoints: CustodyEndpoints,
}

impl CustodyConfig {
    /// Resolve the client id and secret, reading the environment where referenced.
    pub fn credentials(&self) -> Result<ClientCredentials> {
        Ok(ClientCredentials {
            client_id: self.client_id.resolve()?,
            client_secret: self.client_secret.resolve()?,
        })
    }
}

/// Resolved custody credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustodyEndpoints {
    pub auth: String,
    pub deploy: String,
    pub requests: String,
    pub approve: String,
    pub whitelists: String,
    pub whitelist_approve: String,
}

impl Default for CustodyEndpoints {
    fn default() -> Self {
        Self {
            auth: "/api/auth/token".to_string(),
            deploy: "/api/contracts/deploy".to_string(),
            requests: "/api/requests".to_string(),
            approve: "/api/requests/approve".to_string(),
            whitelists: "/api/whitelists".to_string(),
            whitelist_approve: "/api/whitelists/approve".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningConfig {
    pub base_url: String,
    #[serde(default = "default_sign_endpoint")]
    pub sign_endpoint: String,
}

fn default_sign_endpoint() -> String {
    "/api/sign".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    #[serde(default = "default_register_endpoint")]
    pub register_endpoint: String,
}

fn default_register_endpoint() -> String {
    "/api/tokens/register".to_string()
}
