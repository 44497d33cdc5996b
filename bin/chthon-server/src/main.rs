//! chthon-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables (CLI flags override).
//! 2. Initialise tracing.
//! 3. Connect to the database and run pending migrations.
//! 4. Build the Axum router and serve with graceful shutdown.

mod blob;
mod config;
mod entities;
mod error;
mod extract;
mod gateway;
mod logging;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::config::Config;
use crate::entities::AnyStore;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "chthon-server", version, about = "Multi-tenant AI chat service")]
struct Cli {
    /// Address to listen on; overrides CHTHON_BIND.
    #[arg(long)]
    bind: Option<String>,

    /// sqlx database URL; overrides CHTHON_DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if let Some(bind) = cli.bind {
        cfg.bind_address = bind;
    }
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = logging::init(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "chthon-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = AnyStore::connect(&cfg.database_url, cfg.database_max_connections).await?;
    info!(backend = cfg.database_url.split(':').next().unwrap_or("unknown"), "database ready");

    if cfg.gateway_api_key.is_none() {
        warn!("EDEN_AI_API_KEY is not set; /api/chat will answer 503");
    }
    if cfg.blob_token.is_none() {
        warn!("BLOB_READ_WRITE_TOKEN is not set; /api/upload will answer 503");
    }
    if cfg.admin_key.is_none() {
        warn!("ADMIN_KEY is not set; admin routes are locked");
    }

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let app = routes::build(Arc::new(AppState::new(cfg, store)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("chthon-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
