use thiserror::Error;

/// Errors surfaced by the repository helpers and the connection layer beneath them.
///
/// Driver errors pass through unchanged; the remaining variants are the few conditions the
/// repository itself detects (no rows, a missing predicate, an unusable identifier, ...).
#[derive(Debug, Error)]
pub enum SqlRepoError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// The query succeeded but produced no rows.
    #[error("not found")]
    NotFound,

    /// A single-row lookup produced more than one row.
    #[error("expected exactly one row, found {0}")]
    MultipleRows(usize),

    /// UPDATE/DELETE called without a WHERE predicate.
    #[error("there is no data to update: a predicate is required")]
    MissingPredicate,

    /// INSERT/UPDATE called without any column values.
    #[error("no column values supplied")]
    NoValues,

    /// The INSERT ran but no id came back from the RETURNING clause.
    #[error("insert into {0} returned no id")]
    MissingReturnedId(String),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Value conversion error: {0}")]
    ConversionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlRepoError {
    /// True for the "query succeeded, zero rows" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type Result<T, E = SqlRepoError> = std::result::Result<T, E>;
