//! Declarative connection settings, for applications that keep them in a config file.
//!
//! ```json
//! { "backend": "sqlite", "path": "app.db", "translate_placeholders": true, "max_size": 4 }
//! ```
//! ```json
//! { "backend": "postgres", "host": "db", "dbname": "app", "user": "app",
//!   "password_env": "APP_PG_PASSWORD" }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::SqlRepoError;
use crate::pool::{ConfigAndPool, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_SIZE};
use crate::types::DatabaseType;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RepoConfig {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteSection),
    #[cfg(feature = "postgres")]
    Postgres(PostgresSection),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolSection {
    #[serde(default)]
    pub translate_placeholders: bool,
    pub max_size: Option<u32>,
    pub connection_timeout_ms: Option<u64>,
}

impl PoolSection {
    fn max_size(&self) -> u32 {
        self.max_size.unwrap_or(DEFAULT_MAX_SIZE)
    }

    fn connection_timeout(&self) -> Duration {
        self.connection_timeout_ms
            .map_or(DEFAULT_CONNECTION_TIMEOUT, Duration::from_millis)
    }
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteSection {
    pub path: String,
    #[serde(flatten)]
    pub pool: PoolSection,
}

#[cfg(feature = "postgres")]
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSection {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    /// Name of an environment variable holding the password; wins over `password`.
    pub password_env: Option<String>,
    #[serde(flatten)]
    pub pool: PoolSection,
}

#[cfg(feature = "postgres")]
fn default_pg_port() -> u16 {
    5432
}

#[cfg(feature = "postgres")]
impl PostgresSection {
    /// Build the driver config, resolving `password_env` if set.
    ///
    /// # Errors
    /// `ConfigError` if `password_env` names a variable that is not set.
    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config, SqlRepoError> {
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user);
        let password = match &self.password_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                SqlRepoError::ConfigError(format!("environment variable {var} is not set"))
            })?),
            None => self.password.clone(),
        };
        if let Some(pw) = password {
            cfg.password(pw);
        }
        Ok(cfg)
    }
}

impl RepoConfig {
    /// Parse a JSON document.
    ///
    /// # Errors
    /// `ConfigError` describing the parse failure.
    pub fn from_json_str(json: &str) -> Result<Self, SqlRepoError> {
        serde_json::from_str(json)
            .map_err(|e| SqlRepoError::ConfigError(format!("invalid repository config: {e}")))
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "sqlite")]
            RepoConfig::Sqlite(_) => DatabaseType::Sqlite,
            #[cfg(feature = "postgres")]
            RepoConfig::Postgres(_) => DatabaseType::Postgres,
        }
    }

    /// Create the pool described by this config.
    ///
    /// # Errors
    /// Whatever the backend's `ConfigAndPool` constructor reports.
    pub async fn connect(&self) -> Result<ConfigAndPool, SqlRepoError> {
        match self {
            #[cfg(feature = "sqlite")]
            RepoConfig::Sqlite(section) => {
                ConfigAndPool::sqlite_builder(section.path.clone())
                    .translation(section.pool.translate_placeholders)
                    .max_size(section.pool.max_size())
                    .connection_timeout(section.pool.connection_timeout())
                    .build()
                    .await
            }
            #[cfg(feature = "postgres")]
            RepoConfig::Postgres(section) => {
                ConfigAndPool::postgres_builder(section.to_pg_config()?)
                    .translation(section.pool.translate_placeholders)
                    .max_size(section.pool.max_size())
                    .connection_timeout(section.pool.connection_timeout())
                    .build()
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlite")]
    #[test]
    fn parses_sqlite_section() {
        let cfg = RepoConfig::from_json_str(
            r#"{"backend":"sqlite","path":"app.db","translate_placeholders":true,"max_size":4}"#,
        )
        .unwrap();
        assert_eq!(cfg.database_type(), DatabaseType::Sqlite);
        let RepoConfig::Sqlite(section) = cfg else {
            panic!("expected sqlite section");
        };
        assert_eq!(section.path, "app.db");
        assert!(section.pool.translate_placeholders);
        assert_eq!(section.pool.max_size(), 4);
        assert_eq!(section.pool.connection_timeout(), DEFAULT_CONNECTION_TIMEOUT);
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn parses_postgres_section_with_defaults() {
        let json = serde_json::json!({
            "backend": "postgres",
            "host": "db",
            "dbname": "app",
            "user": "svc",
            "password": "pw",
            "connection_timeout_ms": 250,
        });
        let cfg = RepoConfig::from_json_str(&json.to_string()).unwrap();
        let RepoConfig::Postgres(section) = cfg else {
            panic!("expected postgres section");
        };
        assert_eq!(section.port, 5432);
        assert_eq!(section.pool.connection_timeout(), Duration::from_millis(250));
        let pg = section.to_pg_config().unwrap();
        assert_eq!(pg.get_dbname(), Some("app"));
        assert_eq!(pg.get_user(), Some("svc"));
        assert_eq!(pg.get_password(), Some(&b"pw"[..]));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn missing_password_env_is_a_config_error() {
        let section = PostgresSection {
            host: "db".into(),
            port: 5432,
            dbname: "app".into(),
            user: "svc".into(),
            password: None,
            password_env: Some("SQL_REPOSITORY_TEST_UNSET_PASSWORD_VAR".into()),
            pool: PoolSection::default(),
        };
        assert!(matches!(
            section.to_pg_config(),
            Err(SqlRepoError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = RepoConfig::from_json_str(r#"{"backend":"oracle"}"#).unwrap_err();
        assert!(matches!(err, SqlRepoError::ConfigError(_)));
    }
}
