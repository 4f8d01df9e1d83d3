//! edstats server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use edstats_client::SourceDb;
use edstats_core::cache::CacheStore;
use edstats_core::config::CacheBackend;
use edstats_core::tenant::StaticTenant;
use edstats_core::{AppConfig, InvalidationHook, MemoryCache, MutationNotifier, StatsDb, StatsService};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod scheduler;
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
        db_path = %config.db_path.display(),
        source_db_path = %config.source_db_path.display(),
        cache_backend = ?config.cache_backend,
        "Starting edstats server on stdio transport"
    );

    let db = Arc::new(StatsDb::open(&config.db_path).await?);
    let cache: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Sqlite => db.clone(),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
    };

    let source = Arc::new(SourceDb::new(&config.source_db_path));
    let tenant = Arc::new(StaticTenant::new(config.site_name.clone()));
    let service = Arc::new(StatsService::new(&config, source, cache.clone(), db, tenant));

    let hook = Arc::new(InvalidationHook::new(cache));
    let mut notifier = MutationNotifier::new();
    hook.register(&mut notifier);

    let scheduler = config
        .refresh_interval()
        .map(|interval| scheduler::RefreshScheduler::new(service.clone(), interval).start());

    let handler = handler::EdStatsServer::new(service, Arc::new(notifier), hook);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    Ok(())
}
