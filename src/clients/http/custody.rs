// ABOUTME: reqwest implementation of the custody platform client.
// ABOUTME: JSON over HTTPS with bearer tokens; 401 maps to Unauthorized.

use super::{build_client, join_url};
use crate::clients::{CustodyClient, CustodyError, RequestDetails, WhitelistDetails};
use crate::config::{ClientCredentials, CustodyConfig, CustodyEndpoints};
use crate::types::{AuthToken, RequestId, WhitelistId};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct AuthRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: String,
}

#[derive(Serialize)]
struct DeployRequest<'a> {
    bytecode: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    constructor_args: Option<&'a str>,
}

#[derive(Deserialize)]
struct DeployResponse {
    request_id: String,
}

#[derive(Deserialize)]
struct RequestsResponse {
    #[serde(default)]
    requests: Vec<RawRequest>,
}

#[derive(Deserialize)]
struct RawRequest {
    hash: String,
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default)]
    status: String,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    whitelist_id: Option<String>,
}

#[derive(Serialize)]
struct ApproveRequest<'a> {
    request_id: &'a str,
    signature: &'a str,
}

#[derive(Deserialize)]
struct WhitelistsResponse {
    #[serde(default)]
    whitelists: Vec<RawWhitelist>,
}

#[derive(Deserialize)]
struct RawWhitelist {
    hash: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Serialize)]
struct WhitelistApproveRequest<'a> {
    whitelist_id: &'a str,
    signature: &'a str,
}

/// HTTP client for the custody platform.
#[derive(Debug, Clone)]
pub struct HttpCustodyClient {
    client: Client,
    base_url: String,
    endpoints: CustodyEndpoints,
    credentials: ClientCredentials,
}

impl HttpCustodyClient {
    pub fn new(
        config: &CustodyConfig,
        credentials: ClientCredentials,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            endpoints: config.endpoints.clone(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

/// Reject non-2xx responses, keeping the body for the error message.
async fn check(response: Response) -> Result<Response, CustodyError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(CustodyError::Unauthorized);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CustodyError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

fn transport(err: reqwest::Error) -> CustodyError {
    if err.is_decode() {
        CustodyError::InvalidResponse(err.to_string())
    } else {
        CustodyError::Transport(err.to_string())
    }
}

fn first_request(body: RequestsResponse, id: &RequestId) -> Result<RequestDetails, CustodyError> {
    let raw = body
        .requests
        .into_iter()
        .next()
        .ok_or_else(|| CustodyError::NotFound {
            kind: "request",
            id: id.to_string(),
        })?;

    Ok(RequestDetails {
        hash: raw.hash,
        metadata: raw.metadata,
        status: raw.status,
        contract_address: raw.contract_address.filter(|s| !s.is_empty()),
        transaction_hash: raw.transaction_hash.filter(|s| !s.is_empty()),
        whitelist_id: raw
            .whitelist_id
            .filter(|s| !s.is_empty())
            .map(WhitelistId::new),
    })
}

fn first_whitelist(
    body: WhitelistsResponse,
    id: &WhitelistId,
) -> Result<WhitelistDetails, CustodyError> {
    let raw = body
        .whitelists
        .into_iter()
        .next()
        .ok_or_else(|| CustodyError::NotFound {
            kind: "whitelist",
            id: id.to_string(),
        })?;

    Ok(WhitelistDetails {
        hash: raw.hash,
        metadata: raw.metadata,
    })
}

#[async_trait]
impl CustodyClient for HttpCustodyClient {
    async fn authenticate(&self) -> Result<AuthToken, CustodyError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.auth))
            .json(&AuthRequest {
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
            })
            .send()
            .await
            .map_err(transport)?;

        let body: AuthResponse = check(response).await?.json().await.map_err(transport)?;
        if body.access_token.is_empty() {
            return Err(CustodyError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(AuthToken::new(body.access_token))
    }

    async fn request_deployment(
        &self,
        token: &AuthToken,
        bytecode: &str,
        name: &str,
        constructor_args: Option<&str>,
    ) -> Result<RequestId, CustodyError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.deploy))
            .bearer_auth(token.expose())
            .json(&DeployRequest {
                bytecode,
                name,
                constructor_args: constructor_args.filter(|args| !args.is_empty()),
            })
            .send()
            .await
            .map_err(transport)?;

        let body: DeployResponse = check(response).await?.json().await.map_err(transport)?;
        if body.request_id.is_empty() {
            return Err(CustodyError::InvalidResponse("empty request_id".to_string()));
        }
        Ok(RequestId::new(body.request_id))
    }

    async fn get_request_details(
        &self,
        token: &AuthToken,
        request_id: &RequestId,
    ) -> Result<RequestDetails, CustodyError> {
        let response = self
            .client
            .get(self.url(&self.endpoints.requests))
            .query(&[("ids", request_id.as_str())])
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(transport)?;

        let body: RequestsResponse = check(response).await?.json().await.map_err(transport)?;
        first_request(body, request_id)
    }

    async fn approve(
        &self,
        token: &AuthToken,
        request_id: &RequestId,
        signature: &str,
    ) -> Result<(), CustodyError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.approve))
            .bearer_auth(token.expose())
            .json(&ApproveRequest {
                request_id: request_id.as_str(),
                signature,
            })
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }

    async fn get_whitelist_details(
        &self,
        token: &AuthToken,
        whitelist_id: &WhitelistId,
    ) -> Result<WhitelistDetails, CustodyError> {
        let response = self
            .client
            .get(self.url(&self.endpoints.whitelists))
            .query(&[("ids", whitelist_id.as_str())])
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(transport)?;

        let body: WhitelistsResponse = check(response).await?.json().await.map_err(transport)?;
        first_whitelist(body, whitelist_id)
    }

    async fn approve_whitelist(
        &self,
        token: &AuthToken,
        whitelist_id: &WhitelistId,
        signature: &str,
    ) -> Result<(), CustodyError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.whitelist_approve))
            .bearer_auth(token.expose())
            .json(&WhitelistApproveRequest {
                whitelist_id: whitelist_id.as_str(),
                signature,
            })
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }
}
