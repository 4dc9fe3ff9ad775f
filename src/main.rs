//! Shoplens - product search relevance service
//!
//! Shopping search with LLM result filtering and an in-memory TTL+LRU
//! result cache.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use shoplens::{
    cli::Cli,
    config::Config,
    filter::OpenAiFilter,
    search::OxylabsClient,
    server::{self, AppState},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            if cli.no_cache {
                config.cache.enabled = false;
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        cache_enabled = config.cache.enabled,
        model = %config.filter.model,
        "Starting shoplens"
    );

    // Build the provider collaborators and shared state
    let search = match OxylabsClient::new(config.search.clone()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create search client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = match OpenAiFilter::new(config.filter.clone()) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to create filter client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let state = Arc::new(AppState::new(&config, search, filter));

    // Run with graceful shutdown
    if let Err(e) = server::run(&config, state).await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
