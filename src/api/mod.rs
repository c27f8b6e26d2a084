// ABOUTME: REST API for the deployment saga, built on axum.
// ABOUTME: Routes inbound operations to the orchestrator and traces every request.

mod deployments;
mod error;

pub use deployments::{DeployRequest, DeploymentResponse};
pub use error::{ApiError, ErrorResponse, status_for};

use crate::saga::SagaOrchestrator;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub saga: Arc<SagaOrchestrator>,
}

impl AppState {
    pub fn new(saga: Arc<SagaOrchestrator>) -> Self {
        Self { saga }
    }
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/deploy", post(deployments::deploy))
        .route("/:request_id/approve", post(deployments::approve))
        .route("/:request_id/whitelist", post(deployments::whitelist))
        .route("/:request_id/status", get(deployments::status))
        .route("/:request_id/cancel", post(deployments::cancel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse { status: "healthy" })
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}
