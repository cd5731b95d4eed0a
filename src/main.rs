//! Stream Gateway Server
//!
//! Loads configuration, connects the backend session pool and serves files
//! over HTTP.
//!
//! # Usage
//! ```bash
//! # Start with default config (stream_gateway.yaml)
//! stream-gateway
//!
//! # Start with custom config
//! stream-gateway /path/to/config.yaml
//! ```

use anyhow::Context;
use std::env;
use std::sync::Arc;
use stream_gateway::backend::http::HttpSession;
use stream_gateway::backend::{BackendSession, SessionPool};
use stream_gateway::{FileCatalog, GatewayConfig, GatewayServer, StreamGateway};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting stream gateway");

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "stream_gateway.yaml".to_string());
    info!("Loading configuration from: {}", config_path);

    let config = GatewayConfig::from_file(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    info!("Configuration loaded successfully");
    info!("  - Chunk size: {} bytes ({} KB)", config.chunk_size, config.chunk_size / 1024);
    info!("  - Sessions: {}", config.sessions.len());
    info!("  - Resolve attempts: {}", config.max_resolve_attempts);
    info!("  - Fetch timeout: {} seconds", config.fetch_timeout_secs);
    info!("  - Catalog: {}", config.catalog_path);
    let config = Arc::new(config);

    let mut sessions: Vec<Arc<dyn BackendSession>> = Vec::with_capacity(config.sessions.len());
    for session in &config.sessions {
        let client = HttpSession::new(session, config.fetch_timeout())
            .with_context(|| format!("creating session {}", session.name))?;
        info!("Session {} connected to {}", session.name, session.base_url);
        sessions.push(Arc::new(client));
    }
    let pool = SessionPool::new(sessions).context("building session pool")?;

    let catalog = Arc::new(
        FileCatalog::from_file(&config.catalog_path)
            .with_context(|| format!("loading catalog {}", config.catalog_path))?,
    );

    let gateway = StreamGateway::new(config.clone(), pool, catalog.clone(), catalog)
        .context("creating gateway")?;
    let addr = config.socket_addr()?;

    GatewayServer::new(Arc::new(gateway))
        .run(addr)
        .await
        .context("serving HTTP")?;
    Ok(())
}
