// ABOUTME: Deployment saga endpoints: deploy, approve, whitelist, status, cancel.
// ABOUTME: Thin handlers that map JSON to orchestrator calls and back.

use super::AppState;
use super::error::ApiError;
use crate::saga::{DeploymentRecord, NewDeployment};
use crate::types::RequestId;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /deploy`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub contract_bytecode: String,
    pub contract_name: String,
    #[serde(default)]
    pub constructor_args: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub requester_id: Option<String>,
}

impl From<DeployRequest> for NewDeployment {
    fn from(request: DeployRequest) -> Self {
        NewDeployment {
            contract_name: request.contract_name,
            contract_bytecode: request.contract_bytecode,
            constructor_args: request.constructor_args,
            network: request.network,
            requester_id: request.requester_id,
        }
    }
}

/// Public view of a deployment record. Credentials and raw hashes stay internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub contract_name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DeploymentRecord> for DeploymentResponse {
    fn from(record: &DeploymentRecord) -> Self {
        Self {
            id: record.id().to_string(),
            request_id: record.request_id().map(ToString::to_string),
            contract_name: record.contract_name().to_string(),
            state: record.state().to_string(),
            transaction_hash: record.transaction_hash().map(str::to_string),
            contract_address: record.contract_address().map(str::to_string),
            whitelist_id: record.whitelist_id().map(ToString::to_string),
            error_message: record.error_message().map(str::to_string),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }
}

pub async fn deploy(
    State(state): State<AppState>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DeploymentResponse>), ApiError> {
    let Json(request) = payload?;
    tracing::info!(contract = %request.contract_name, "deployment requested via API");

    let record = state.saga.initiate_deployment(request.into()).await?;
    Ok((StatusCode::CREATED, Json(DeploymentResponse::from(&record))))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state
        .saga
        .approve_deployment(&RequestId::new(request_id))
        .await?;
    Ok(Json(DeploymentResponse::from(&record)))
}

pub async fn whitelist(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state
        .saga
        .whitelist_contract(&RequestId::new(request_id))
        .await?;
    Ok(Json(DeploymentResponse::from(&record)))
}

pub async fn status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state
        .saga
        .deployment_status(&RequestId::new(request_id))
        .await?;
    Ok(Json(DeploymentResponse::from(&record)))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let record = state
        .saga
        .cancel_deployment(&RequestId::new(request_id))
        .await?;
    Ok(Json(DeploymentResponse::from(&record)))
}
