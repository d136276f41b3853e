//! # pact-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from flags with
//! environment fallbacks; see `pact-api --help`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pact_api::{AppConfig, AppState};
use pact_store::{MemoryStore, PgStore};

/// Pact contract negotiation API server.
#[derive(Parser, Debug)]
#[command(name = "pact-api", version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Shared bearer secret. When absent, secrets are not checked.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// PostgreSQL connection URL. When absent, state is kept in memory.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Maximum connections in the database pool.
    #[arg(long, env = "PACT_DB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Emit logs as JSON lines.
    #[arg(long, env = "PACT_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = AppConfig {
        port: args.port,
        auth_token: args.auth_token,
    };
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; bearer secrets will not be checked");
    }

    let state = match args.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url, args.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            tracing::info!(max_connections = args.max_connections, "using PostgreSQL store");
            AppState::with_store(config.clone(), Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; contracts are kept in memory and lost on restart");
            AppState::with_store(config.clone(), Arc::new(MemoryStore::new()))
        }
    };

    let app = pact_api::app(state).context("registering metrics")?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Pact API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
