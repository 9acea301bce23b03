//! # quill-web — Binary Entry Point
//!
//! Loads `.env`, reads configuration from the environment and command line,
//! opens and migrates the database, and serves the blog until Ctrl-C.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use quill_web::config::{normalize_database_url, AppConfig, ConfigError};
use quill_web::db::sessions::{self, SqlSessionStore};
use quill_web::state::AppState;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// How often expired sessions are deleted.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Quill blog web server.
#[derive(Parser, Debug)]
#[command(name = "quill-web", version, about)]
struct Cli {
    /// Port to listen on. Overrides `PORT`.
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Database connection string. Overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Start without `SECRET_KEY` using a random key. Sessions end on restart.
    #[arg(long)]
    dev: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "QUILL_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingSecret) if cli.dev => {
            tracing::warn!("SECRET_KEY not set, signing sessions with an ephemeral key");
            let secret = ephemeral_secret();
            AppConfig::from_lookup(|key| match key {
                "SECRET_KEY" => Some(secret.clone()),
                other => std::env::var(other).ok(),
            })?
        }
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return Err(e.into());
        }
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(url) = cli.database_url {
        config.database_url = normalize_database_url(&url);
    }
    tracing::info!(?config, "configuration loaded");

    let state = AppState::connect(config).await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    tokio::spawn(sessions::purge_expired(
        SqlSessionStore::new(state.db.clone()),
        SESSION_PURGE_INTERVAL,
    ));

    let addr = SocketAddr::new(cli.host, state.config.port);
    let app = quill_web::app(state);

    tracing::info!("Quill blog listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quill_web=info,tower_http=info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn ephemeral_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
