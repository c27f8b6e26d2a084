// ABOUTME: reqwest implementation of the hash-signing client.

use super::{build_client, join_url};
use crate::clients::{SigningClient, SigningError};
use crate::config::SigningConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct SignRequest<'a> {
    hash: &'a str,
    metadata: &'a str,
}

#[derive(Deserialize)]
struct SignResponse {
    signed_hash: String,
}

#[derive(Debug, Clone)]
pub struct HttpSigningClient {
    client: Client,
    url: String,
}

impl HttpSigningClient {
    pub fn new(config: &SigningConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            url: join_url(config.base_url.trim_end_matches('/'), &config.sign_endpoint),
        })
    }
}

fn transport(err: reqwest::Error) -> SigningError {
    if err.is_decode() {
        SigningError::InvalidResponse(err.to_string())
    } else {
        SigningError::Transport(err.to_string())
    }
}

#[async_trait]
impl SigningClient for HttpSigningClient {
    async fn sign(&self, hash: &str, metadata: &str) -> Result<String, SigningError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SignRequest { hash, metadata })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SigningError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: SignResponse = response.json().await.map_err(transport)?;
        if body.signed_hash.is_empty() {
            return Err(SigningError::InvalidResponse("empty signed_hash".to_string()));
        }
        Ok(body.signed_hash)
    }
}
