// ABOUTME: Entry point for the consign CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use consign::api::DeploymentResponse;
use consign::config::{self, Config};
use consign::error::{Error, Result};
use consign::output::{Output, OutputMode};
use consign::server;
use consign::store::{DeploymentStore, SqliteStore};
use consign::types::RequestId;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose selects debug
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = match &cli.command {
        Commands::Status { json: true, .. } => OutputMode::Json,
        _ => OutputMode::Normal,
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Serve { listen } => {
            let config = Config::discover(&cwd)?;
            let addr = listen.unwrap_or(config.server.listen);
            output.progress(&format!("Serving deployment API on http://{addr}"));
            server::serve(&config, addr).await?;
            Ok(())
        }
        Commands::Status { request_id, .. } => {
            let config = Config::discover(&cwd)?;
            let store = SqliteStore::connect(&config.database.url).await?;
            let record = store
                .find_by_request_id(&RequestId::new(request_id.as_str()))
                .await?
                .ok_or(Error::DeploymentNotFound(request_id))?;

            output.deployment(&DeploymentResponse::from(&record))?;
            Ok(())
        }
    }
}
