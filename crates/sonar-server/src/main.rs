//! Sonar server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sonar_cache::TtlCache;
use sonar_context::{ContextLoader, Fetchers, StoreSearch};
use sonar_llm::{AnthropicBackend, TracingMeter};
use sonar_server::{AppState, Server, ServerConfig};
use sonar_store::{RunLogger, SalesStore};

#[derive(Debug, Parser)]
#[command(name = "sonar-server", about = "Sales-intelligence agent server")]
struct Args {
    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: SocketAddr,

    /// Path to the dashboard SQLite database.
    #[arg(long, env = "SONAR_DB", default_value = "sonar.db")]
    db: PathBuf,

    /// Default completion model.
    #[arg(long, env = "SONAR_MODEL", default_value = "claude-sonnet-4-20250514")]
    model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = Arc::new(SalesStore::open(&args.db).context("opening sales store")?);
    let backend = Arc::new(AnthropicBackend::from_env().context("configuring model provider")?);

    let fetchers = Fetchers::new(Arc::clone(&store), Arc::new(TtlCache::default()));
    let search = Arc::new(StoreSearch::new(Arc::clone(&store)));
    let loader = ContextLoader::new(fetchers, search);

    let config = ServerConfig::new()
        .with_bind_address(args.bind)
        .with_default_model(args.model);

    let state = AppState::new(
        backend,
        loader,
        RunLogger::new(store),
        Arc::new(TracingMeter),
        config,
    );

    Server::from_state(state).run().await?;
    Ok(())
}
