//! Typed repository helpers over pooled `PostgreSQL` and `SQLite` connections.
//!
//! A [`Repository`] wraps a [`ConfigAndPool`] and offers count/select helpers for
//! caller-written SQL plus transactional insert/update/delete that either commit at once or
//! hand the open transaction back to the caller.
//!
//! ```rust,no_run
//! use sql_repository::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlRepoError> {
//! let pool = ConfigAndPool::sqlite_builder("app.db").build().await?;
//! let rows: Repository<CustomDbRow, i64> = Repository::new(pool);
//! let n = rows.count("SELECT COUNT(*) FROM users", &[]).await?;
//! # let _ = n;
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod repository;
pub mod results;
pub mod statement;
pub mod translation;
pub mod tx_outcome;
pub mod typed;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::RepoConfig;
pub use error::{Result, SqlRepoError};
pub use model::{FromRow, FromValue, Model};
pub use pool::{ConfigAndPool, RepoPool};
pub use query_builder::{QueryBuilder, Queryable};
pub use repository::{CommitMode, Repository};
pub use results::{CustomDbRow, ResultSet};
pub use translation::{PlaceholderStyle, QueryOptions, TranslationMode, translate_placeholders};
pub use tx_outcome::TxOutcome;
pub use typed::{AnyIdle, AnyTx, BeginTx, TxConn, TypedConnOps};
pub use types::{DatabaseType, RowValues};
