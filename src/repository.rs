//! Typed CRUD helpers over a [`ConfigAndPool`].
//!
//! Reads run caller-supplied SQL and map rows through [`FromRow`]. Writes generate their own
//! SQL from validated identifiers, run inside a transaction, and either commit before
//! returning or hand the open transaction back in a [`TxOutcome`].

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::error::SqlRepoError;
use crate::model::{FromRow, FromValue, Model};
use crate::pool::ConfigAndPool;
use crate::query_builder::Queryable;
use crate::results::ResultSet;
use crate::statement;
use crate::translation::{QueryOptions, TranslationMode};
use crate::tx_outcome::TxOutcome;
use crate::typed::{AnyTx, BeginTx, TxConn, TypedConnOps};
use crate::types::RowValues;

/// What a write does with its transaction once the statement succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Commit before returning.
    #[default]
    Immediate,
    /// Return the open transaction inside the [`TxOutcome`].
    Deferred,
}

/// Repository for rows of type `R` identified by `Id`.
///
/// ```rust,no_run
/// use sql_repository::prelude::*;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError> {
///         Ok(User { id: row.try_get("id")?, name: row.try_get("name")? })
///     }
/// }
///
/// impl Model for User {
///     const TABLE: &'static str = "users";
///     fn values(&self) -> Vec<(&'static str, RowValues)> {
///         vec![("name", self.name.clone().into())]
///     }
/// }
///
/// # async fn demo(pool: ConfigAndPool) -> Result<(), SqlRepoError> {
/// let users: Repository<User, i64> = Repository::new(pool);
/// let id = users
///     .insert_tx(&User { id: 0, name: "ada".into() }, CommitMode::Immediate)
///     .await?
///     .into_value();
/// let user = users
///     .select_by("SELECT id, name FROM users WHERE id = $1", &[RowValues::Int(id)])
///     .await?;
/// assert_eq!(user.name, "ada");
/// # Ok(()) }
/// ```
pub struct Repository<R, Id> {
    pool: ConfigAndPool,
    options: QueryOptions,
    _marker: PhantomData<fn() -> (R, Id)>,
}

impl<R, Id> Clone for Repository<R, Id> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            options: self.options,
            _marker: PhantomData,
        }
    }
}

impl<R, Id> std::fmt::Debug for Repository<R, Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("pool", &self.pool)
            .field("options", &self.options)
            .finish()
    }
}

impl<R: FromRow, Id: FromValue> Repository<R, Id> {
    #[must_use]
    pub fn new(pool: ConfigAndPool) -> Self {
        Self {
            pool,
            options: QueryOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Override placeholder translation for the SQL passed to `count` and the `select_*`
    /// methods. Generated statements always use the backend's native placeholders.
    ///
    /// By default caller SQL is normalised to the backend's style whenever arguments are
    /// bound, so `$N` and `?N` both bind by number. `ForceOff` sends the text unchanged; on
    /// `SQLite` that turns `$N` into named parameters numbered by first appearance.
    #[must_use]
    pub fn with_translation(mut self, mode: TranslationMode) -> Self {
        self.options = self.options.with_translation(mode);
        self
    }

    #[must_use]
    pub fn pool(&self) -> &ConfigAndPool {
        &self.pool
    }

    async fn fetch(&self, query: &str, args: &[RowValues]) -> Result<ResultSet, SqlRepoError> {
        let mut conn = self.pool.checkout().await?;
        tracing::debug!(sql = query, args = args.len(), "repository select");
        conn.query(query)
            .params(args)
            .options(self.read_options())
            .select()
            .await
    }

    fn read_options(&self) -> QueryOptions {
        match self.options.translation {
            TranslationMode::PoolDefault => self.options.with_translation(TranslationMode::ForceOn),
            _ => self.options,
        }
    }

    /// Run `query` and read the first column of the first row as an integer.
    ///
    /// Zero rows and NULL both count as 0.
    ///
    /// # Errors
    /// Backend errors, or `ConversionError` if the value is not an integer.
    pub async fn count(&self, query: &str, args: &[RowValues]) -> Result<i64, SqlRepoError> {
        let rs = self.fetch(query, args).await?;
        match rs.first().and_then(|row| row.get_by_index(0)) {
            None | Some(RowValues::Null) => Ok(0),
            Some(value) => i64::from_value(value),
        }
    }

    /// Like [`count`](Self::count), but any error is logged and reported as 0.
    pub async fn count_or_zero(&self, query: &str, args: &[RowValues]) -> i64 {
        match self.count(query, args).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, sql = query, "count failed, reporting 0");
                0
            }
        }
    }

    /// Exactly one row.
    ///
    /// # Errors
    /// `NotFound` for zero rows, `MultipleRows` for more than one, plus backend and
    /// conversion errors.
    pub async fn select_by(&self, query: &str, args: &[RowValues]) -> Result<R, SqlRepoError> {
        let rs = self.fetch(query, args).await?;
        match rs.results.as_slice() {
            [] => Err(SqlRepoError::NotFound),
            [row] => R::from_row(row),
            rows => Err(SqlRepoError::MultipleRows(rows.len())),
        }
    }

    /// First row of the result.
    ///
    /// # Errors
    /// `NotFound` for zero rows, plus backend and conversion errors.
    pub async fn select_one(&self, query: &str, args: &[RowValues]) -> Result<R, SqlRepoError> {
        let rs = self.fetch(query, args).await?;
        rs.first().map_or(Err(SqlRepoError::NotFound), R::from_row)
    }

    /// Every row; an empty result is an empty vector.
    ///
    /// # Errors
    /// Backend and conversion errors.
    pub async fn select_list(
        &self,
        query: &str,
        args: &[RowValues],
    ) -> Result<Vec<R>, SqlRepoError> {
        let rs = self.fetch(query, args).await?;
        rs.results.iter().map(R::from_row).collect()
    }

    /// Insert `data` and return the id from `RETURNING`.
    ///
    /// # Errors
    /// `NoValues` or `InvalidIdentifier` before any transaction starts; `MissingReturnedId`
    /// if the insert yields no id; backend and conversion errors. The transaction is rolled
    /// back on every error after `BEGIN`.
    pub async fn insert_tx(
        &self,
        data: &R,
        mode: CommitMode,
    ) -> Result<TxOutcome<Id>, SqlRepoError>
    where
        R: Model,
    {
        let (columns, values): (Vec<&str>, Vec<RowValues>) = data.values().into_iter().unzip();
        let sql = statement::insert_returning(
            self.pool.placeholder_style(),
            R::TABLE,
            &columns,
            R::ID_COLUMN,
        )?;

        let mut tx = self.begin().await?;
        tracing::debug!(table = R::TABLE, sql = %sql, "repository insert");
        let result = match tx.select(&sql, &values).await {
            Ok(rs) => match rs.first().and_then(|row| row.get_by_index(0)) {
                Some(id) if !id.is_null() => Id::from_value(id),
                _ => Err(SqlRepoError::MissingReturnedId(R::TABLE.to_owned())),
            },
            Err(e) => Err(e),
        };
        settle(tx, result, mode).await
    }

    /// `UPDATE table SET .. WHERE predicate`, returning rows affected.
    ///
    /// The predicate's placeholders are numbered from 1 against `args`, in either `$N` or
    /// `?N` form. Updating zero rows is not an error.
    ///
    /// # Errors
    /// `MissingPredicate`, `NoValues`, `InvalidIdentifier`, or too few `args`, all before any
    /// transaction starts; backend errors afterwards, with the transaction rolled back.
    pub async fn update_tx(
        &self,
        table: &str,
        values: &BTreeMap<String, RowValues>,
        predicate: &str,
        args: &[RowValues],
        mode: CommitMode,
    ) -> Result<TxOutcome<usize>, SqlRepoError> {
        statement::check_arity(predicate, args.len())?;
        let sql = statement::update_where(
            self.pool.placeholder_style(),
            table,
            values.keys().map(String::as_str),
            predicate,
        )?;
        let params: Vec<RowValues> = values.values().chain(args).cloned().collect();

        let mut tx = self.begin().await?;
        tracing::debug!(table, sql = %sql, "repository update");
        let result = tx.dml(&sql, &params).await;
        settle(tx, result, mode).await
    }

    /// `DELETE FROM table WHERE predicate`, returning rows affected.
    ///
    /// When nothing matched, the transaction is rolled back and the outcome holds 0 with no
    /// pending transaction, whatever `mode` asked for.
    ///
    /// # Errors
    /// `MissingPredicate`, `InvalidIdentifier`, or too few `args` before any transaction
    /// starts; backend errors afterwards, with the transaction rolled back.
    pub async fn delete_tx(
        &self,
        table: &str,
        predicate: &str,
        args: &[RowValues],
        mode: CommitMode,
    ) -> Result<TxOutcome<usize>, SqlRepoError> {
        statement::check_arity(predicate, args.len())?;
        let sql = statement::delete_where(self.pool.placeholder_style(), table, predicate)?;

        let mut tx = self.begin().await?;
        tracing::debug!(table, sql = %sql, "repository delete");
        let result = tx.dml(&sql, args).await;
        match result {
            Ok(0) => {
                tx.rollback().await?;
                Ok(TxOutcome::finished(0))
            }
            result => settle(tx, result, mode).await,
        }
    }

    async fn begin(&self) -> Result<AnyTx, SqlRepoError> {
        self.pool.checkout().await?.begin().await
    }
}

/// Commit or hand back `tx` on success; roll it back on failure.
async fn settle<T>(
    tx: AnyTx,
    result: Result<T, SqlRepoError>,
    mode: CommitMode,
) -> Result<TxOutcome<T>, SqlRepoError> {
    match result {
        Ok(value) => match mode {
            CommitMode::Immediate => {
                tx.commit().await?;
                Ok(TxOutcome::finished(value))
            }
            CommitMode::Deferred => Ok(TxOutcome::pending(value, tx)),
        },
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    error = %rollback_err,
                    cause = %e,
                    "rollback after failed write failed"
                );
            }
            Err(e)
        }
    }
}
