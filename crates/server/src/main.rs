//! pwacache-host entry point.
//!
//! Loads the worker configuration, opens the cache database and serves the
//! worker's triggers as MCP tools on stdio. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use pwacache_client::{ClientRegistry, FetchConfig, HttpFetcher, ServiceWorker};
use pwacache_core::{AppConfig, CacheStorage};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        "Starting pwacache-host for {} on stdio transport (db: {})",
        config.cache_name(),
        config.db_path.display()
    );

    let storage = CacheStorage::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;
    tracing::debug!(
        "fetching as {} (limit {} bytes, timeout {}ms)",
        fetcher.config().user_agent,
        fetcher.config().max_bytes,
        fetcher.config().timeout.as_millis()
    );
    let clients = ClientRegistry::new();
    let worker = ServiceWorker::new(config, storage.clone(), Arc::new(fetcher), Arc::new(clients.clone()));

    let handler = handler::WorkerHost::new(Arc::new(worker), clients);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    storage.close().await?;

    Ok(())
}
