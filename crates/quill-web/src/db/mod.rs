//! # Database Persistence Layer
//!
//! Users, posts, comments and login sessions live in a relational database
//! reached through
//! SQLx's `Any` driver, so one binary serves both deployment shapes:
//!
//! - **SQLite** (`sqlite://blog.db?mode=rwc`) for local development and tests.
//! - **PostgreSQL** (`postgresql://…`) in production.
//!
//! Queries use `$N` placeholders, which both backends accept. Each backend
//! has its own migration directory because the DDL differs (`BIGSERIAL`
//! versus `INTEGER PRIMARY KEY AUTOINCREMENT`).
//!
//! Read helpers take the pool. Write helpers take a connection so callers
//! group them in a transaction and commit once; a dropped transaction rolls
//! back.

pub mod comments;
pub mod posts;
pub mod sessions;
pub mod users;

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::AppConfig;

/// Database engine behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    /// Detect the backend from the URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once(':')?.0;
        match scheme {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Open the connection pool and apply pending migrations.
pub async fn init_pool(config: &AppConfig) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    let backend = Backend::from_url(&config.database_url).ok_or_else(|| {
        sqlx::Error::Configuration(
            "DATABASE_URL must start with sqlite:, postgres: or postgresql:".into(),
        )
    })?;

    let pool = AnyPoolOptions::new()
        .max_connections(config.db_max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    tracing::info!(?backend, "connected to database");

    match backend {
        Backend::Postgres => sqlx::migrate!("./migrations/postgres").run(&pool).await?,
        Backend::Sqlite => sqlx::migrate!("./migrations/sqlite").run(&pool).await?,
    }
    tracing::info!("database migrations applied");

    Ok(pool)
}

/// Cheap round trip used by the readiness check.
pub async fn ping(pool: &AnyPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}


/// Migrated SQLite pool in a temporary directory, for repository tests.
#[cfg(test)]
pub(crate) async fn test_pool() -> (AnyPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let config = AppConfig::new("0123456789abcdef", url);
    let pool = init_pool(&config).await.expect("pool");
    (pool, dir)
}
