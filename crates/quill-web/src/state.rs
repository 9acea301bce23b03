//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Cloning is cheap: the configuration sits
//! behind an `Arc` and the pool is reference-counted internally.

use std::sync::Arc;

use quill_core::PasswordHasher;
use sqlx::AnyPool;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration.
    pub config: Arc<AppConfig>,
    /// Connection pool for users, posts and comments.
    pub db: AnyPool,
    /// Hasher for new passwords, using the configured iteration count.
    pub hasher: PasswordHasher,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("db_size", &self.db.size())
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl AppState {
    /// Build state around an already opened pool.
    pub fn new(config: AppConfig, db: AnyPool) -> Self {
        let hasher = PasswordHasher::new(config.password_iterations);
        Self {
            config: Arc::new(config),
            db,
            hasher,
        }
    }

    /// Open the database named in `config`, migrate it, and build state.
    pub async fn connect(config: AppConfig) -> Result<Self, sqlx::Error> {
        let db = crate::db::init_pool(&config).await?;
        Ok(Self::new(config, db))
    }
}
