use std::borrow::Cow;

use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::translation::{QueryOptions, TranslationMode, translate_placeholders};
use crate::typed::TypedConnOps;
use crate::types::RowValues;

/// Fluent builder for a single statement with optional placeholder translation.
///
/// ```rust,no_run
/// use sql_repository::prelude::*;
///
/// # async fn demo(conn: &mut AnyIdle) -> Result<(), SqlRepoError> {
/// let rs = conn
///     .query("SELECT name FROM users WHERE id = $1")
///     .params(&[RowValues::Int(7)])
///     .translation(TranslationMode::ForceOn)
///     .select()
///     .await?;
/// # let _ = rs;
/// # Ok(()) }
/// ```
pub struct QueryBuilder<'conn, 'q, C> {
    conn: &'conn mut C,
    sql: Cow<'q, str>,
    params: Cow<'q, [RowValues]>,
    options: QueryOptions,
}

impl<'conn, 'q, C: TypedConnOps> QueryBuilder<'conn, 'q, C> {
    pub(crate) fn new(conn: &'conn mut C, sql: &'q str) -> Self {
        Self {
            conn,
            sql: Cow::Borrowed(sql),
            params: Cow::Borrowed(&[]),
            options: QueryOptions::default(),
        }
    }

    #[must_use]
    pub fn params(mut self, params: &'q [RowValues]) -> Self {
        self.params = Cow::Borrowed(params);
        self
    }

    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn translation(mut self, translation: TranslationMode) -> Self {
        self.options.translation = translation;
        self
    }

    /// Execute as a query and collect the rows.
    ///
    /// # Errors
    /// Returns whatever the backend reports.
    pub async fn select(self) -> Result<ResultSet, SqlRepoError> {
        let sql = translate_for(&*self.conn, &self.sql, &self.params, self.options);
        self.conn.select(&sql, &self.params).await
    }

    /// Execute as DML and return rows affected.
    ///
    /// # Errors
    /// Returns whatever the backend reports.
    pub async fn dml(self) -> Result<usize, SqlRepoError> {
        let sql = translate_for(&*self.conn, &self.sql, &self.params, self.options);
        self.conn.dml(&sql, &self.params).await
    }
}

fn translate_for<'a, C: TypedConnOps>(
    conn: &C,
    sql: &'a str,
    params: &[RowValues],
    options: QueryOptions,
) -> Cow<'a, str> {
    if params.is_empty() {
        return Cow::Borrowed(sql);
    }
    let enabled = options.translation.resolve(conn.translation_default());
    translate_placeholders(sql, conn.placeholder_style(), enabled)
}

/// Entry point for [`QueryBuilder`] on any connection.
pub trait Queryable: TypedConnOps + Sized {
    fn query<'a>(&'a mut self, sql: &'a str) -> QueryBuilder<'a, 'a, Self> {
        QueryBuilder::new(self, sql)
    }
}

impl<C: TypedConnOps> Queryable for C {}
