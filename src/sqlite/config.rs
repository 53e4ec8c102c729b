use std::time::Duration;

use super::manager::SqliteManager;
use crate::error::SqlRepoError;
use crate::pool::{ConfigAndPool, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_SIZE, RepoPool};
use crate::types::DatabaseType;

/// Options for configuring a `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub translate_placeholders: bool,
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            translate_placeholders: false,
            max_size: DEFAULT_MAX_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Fluent builder for `SqliteOptions`.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.opts.max_size = max_size;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout = timeout;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `SQLite`.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if the options are invalid or the first connection fails.
    pub async fn build(self) -> Result<ConfigAndPool, SqlRepoError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Create a `SQLite` pool. Connections are opened in WAL mode.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConfigError` for an empty path or zero pool size, and
    /// `SqlRepoError::ConnectionError` if the pool cannot be built.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, SqlRepoError> {
        if opts.db_path.trim().is_empty() {
            return Err(SqlRepoError::ConfigError("db_path is required".to_string()));
        }
        if opts.max_size == 0 {
            return Err(SqlRepoError::ConfigError(
                "max_size must be at least 1".to_string(),
            ));
        }
        let pool = SqliteManager::new(opts.db_path)
            .build_pool(opts.max_size, opts.connection_timeout)
            .await?;
        Ok(ConfigAndPool {
            pool: RepoPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
            translate_placeholders: opts.translate_placeholders,
        })
    }
}
