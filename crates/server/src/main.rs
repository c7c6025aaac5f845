//! sw-cache server entry point.
//!
//! Boots the offline fetch interceptor and exposes it as an MCP server on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, FetchInterceptor, Network, PriorInstall, Registration};
use tracing_subscriber::EnvFilter;

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
    let worker_config = config.worker_config()?;

    tracing::info!(
        cache_name = %worker_config.cache_name,
        scope = %worker_config.scope,
        db_path = %config.db_path.display(),
        "Starting sw-cache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = FetchInterceptor::new(worker_config, db, network.clone());
    let registration = Arc::new(Registration::new(worker, network));

    match registration.resume().await? {
        PriorInstall::Current => {}
        prior => {
            // on failure a previous generation keeps serving; with none, fetches pass through
            if let Err(e) = registration.install().await {
                tracing::warn!(error = %e, prior = ?prior, "install failed");
            }
        }
    }

    let handler = handler::SwCacheServer::new(registration);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
