// ABOUTME: Wires configuration, store, and HTTP clients into a running API server.
// ABOUTME: Startup failures use SNAFU context selectors; shutdown is graceful on Ctrl-C.

use crate::api::{self, AppState};
use crate::clients::http::{HttpCustodyClient, HttpRegistryClient, HttpSigningClient};
use crate::config::Config;
use crate::saga::SagaOrchestrator;
use crate::store::{DeploymentStore, SqliteStore, StoreError};
use snafu::{ResultExt, Snafu};
use std::net::SocketAddr;
use std::sync::Arc;

/// Failures while bringing the service up.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ServeError {
    #[snafu(display("failed to resolve custody credentials: {source}"))]
    Credentials { source: Box<crate::error::Error> },

    #[snafu(display("failed to open deployment store at {url}: {source}"))]
    Store { url: String, source: StoreError },

    #[snafu(display("failed to build {service} HTTP client: {source}"))]
    Client {
        service: &'static str,
        source: reqwest::Error,
    },

    #[snafu(display("failed to bind {addr}: {source}"))]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[snafu(display("server error: {source}"))]
    Server { source: std::io::Error },
}

/// Build the orchestrator from configuration, using the SQLite store.
pub async fn build_orchestrator(config: &Config) -> Result<SagaOrchestrator, ServeError> {
    let credentials = config
        .custody
        .credentials()
        .map_err(Box::new)
        .context(CredentialsSnafu)?;

    let store = SqliteStore::connect(&config.database.url)
        .await
        .context(StoreSnafu {
            url: config.database.url.clone(),
        })?;

    let custody = HttpCustodyClient::new(&config.custody, credentials, config.call_timeout)
        .context(ClientSnafu { service: "custody" })?;
    let signer = HttpSigningClient::new(&config.signing, config.call_timeout)
        .context(ClientSnafu { service: "signing" })?;
    let registry = HttpRegistryClient::new(&config.registry, config.call_timeout)
        .context(ClientSnafu {
            service: "registry",
        })?;

    let store: Arc<dyn DeploymentStore> = Arc::new(store);
    Ok(SagaOrchestrator::new(
        store,
        Arc::new(custody),
        Arc::new(signer),
        Arc::new(registry),
    )
    .with_call_timeout(config.call_timeout))
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn serve(config: &Config, addr: SocketAddr) -> Result<(), ServeError> {
    let saga = build_orchestrator(config).await?;
    let app = api::router(AppState::new(Arc::new(saga)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(BindSnafu { addr })?;
    tracing::info!(%addr, "consign listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(ServerSnafu)?;

    tracing::info!("consign stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
