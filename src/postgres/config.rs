use std::time::Duration;

use super::manager::PgManager;
use crate::error::SqlRepoError;
use crate::pool::{ConfigAndPool, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_SIZE, RepoPool};
use crate::types::DatabaseType;

/// Options for configuring a Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
    pub translate_placeholders: bool,
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            translate_placeholders: false,
            max_size: DEFAULT_MAX_SIZE,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

/// Fluent builder for `PostgresOptions`.
#[derive(Debug, Clone)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            opts: PostgresOptions::new(config),
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
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for Postgres.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if required settings are missing or the pool cannot be built.
    pub async fn build(self) -> Result<ConfigAndPool, SqlRepoError> {
        ConfigAndPool::new_postgres(self.finish()).await
    }
}

/// Check the settings a connection cannot be made without.
///
/// # Errors
/// Returns `SqlRepoError::ConfigError` naming the first missing field.
pub fn validate_postgres_config(config: &tokio_postgres::Config) -> Result<(), SqlRepoError> {
    if config.get_dbname().is_none() {
        return Err(SqlRepoError::ConfigError("dbname is required".to_string()));
    }
    if config.get_hosts().is_empty() {
        return Err(SqlRepoError::ConfigError("host is required".to_string()));
    }
    if config.get_user().is_none() {
        return Err(SqlRepoError::ConfigError("user is required".to_string()));
    }
    Ok(())
}

impl ConfigAndPool {
    #[must_use]
    pub fn postgres_builder(config: tokio_postgres::Config) -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new(config)
    }

    /// Create a Postgres pool.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConfigError` if dbname, host or user is missing, and
    /// `SqlRepoError::ConnectionError` if the pool cannot be built.
    pub async fn new_postgres(opts: PostgresOptions) -> Result<Self, SqlRepoError> {
        validate_postgres_config(&opts.config)?;
        if opts.max_size == 0 {
            return Err(SqlRepoError::ConfigError(
                "max_size must be at least 1".to_string(),
            ));
        }
        let pool = PgManager::new(opts.config)
            .build_pool(opts.max_size, opts.connection_timeout)
            .await?;
        Ok(ConfigAndPool {
            pool: RepoPool::Postgres(pool),
            db_type: DatabaseType::Postgres,
            translate_placeholders: opts.translate_placeholders,
        })
    }
}
