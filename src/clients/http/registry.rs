// ABOUTME: reqwest implementation of the token registry client.
// ABOUTME: Any 2xx counts as registered unless the body says otherwise.

use super::{build_client, join_url};
use crate::clients::{RegistryClient, RegistryError};
use crate::config::RegistryConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct RegisterRequest<'a> {
    contract_address: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Deserialize, Default)]
struct RegisterResponse {
    #[serde(default)]
    registered: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: Client,
    url: String,
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            url: join_url(
                config.base_url.trim_end_matches('/'),
                &config.register_endpoint,
            ),
        })
    }
}

/// A body that is empty or not JSON still means success.
fn registered(body: &str) -> bool {
    serde_json::from_str::<RegisterResponse>(body)
        .unwrap_or_default()
        .registered
        .unwrap_or(true)
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register(
        &self,
        contract_address: &str,
        metadata: &serde_json::Value,
    ) -> Result<bool, RegistryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RegisterRequest {
                contract_address,
                metadata,
            })
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(registered(&body))
    }
}
