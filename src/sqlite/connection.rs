use std::marker::PhantomData;
use std::sync::Arc;

use bb8::{Pool, PooledConnection};

use super::manager::{SharedSqliteConnection, SqliteManager, run_blocking};
use super::params::Params;
use super::query::build_result_set;
use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Marker types for typestate
pub enum Idle {}
pub enum InTx {}

/// Typestate wrapper around a pooled `SQLite` connection.
///
/// Dropping a `SqliteConnection<InTx>` without calling `commit` or `rollback` rolls the
/// transaction back before the connection goes back to the pool.
pub struct SqliteConnection<State> {
    conn: Option<PooledConnection<'static, SqliteManager>>,
    needs_rollback: bool,
    translate_placeholders: bool,
    _state: PhantomData<State>,
}

impl SqliteConnection<Idle> {
    /// Checkout a connection from the pool.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConnectionError` if no connection could be checked out.
    pub async fn from_pool(
        pool: &Pool<SqliteManager>,
        translate_placeholders: bool,
    ) -> Result<Self, SqlRepoError> {
        let conn = pool
            .get_owned()
            .await
            .map_err(|e| SqlRepoError::ConnectionError(format!("sqlite checkout error: {e}")))?;
        Ok(Self::wrap(conn, false, translate_placeholders))
    }

    /// Begin an explicit transaction.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `BEGIN` fails.
    pub async fn begin(mut self) -> Result<SqliteConnection<InTx>, SqlRepoError> {
        let conn = self.take_conn()?;
        run_blocking(Arc::clone(&*conn), |guard| {
            guard
                .execute_batch("BEGIN")
                .map_err(SqlRepoError::SqliteError)
        })
        .await?;
        Ok(SqliteConnection::wrap(conn, true, self.translate_placeholders))
    }
}

impl SqliteConnection<InTx> {
    /// Commit and return to idle.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `COMMIT` fails; the transaction is rolled back in that case.
    pub async fn commit(self) -> Result<SqliteConnection<Idle>, SqlRepoError> {
        self.finish("COMMIT").await
    }

    /// Roll back and return to idle.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `ROLLBACK` fails.
    pub async fn rollback(self) -> Result<SqliteConnection<Idle>, SqlRepoError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(mut self, sql: &'static str) -> Result<SqliteConnection<Idle>, SqlRepoError> {
        let conn = self.take_conn()?;
        let result = run_blocking(Arc::clone(&*conn), move |guard| {
            guard.execute_batch(sql).map_err(SqlRepoError::SqliteError)
        })
        .await;
        match result {
            Ok(()) => {
                self.needs_rollback = false;
                Ok(SqliteConnection::wrap(conn, false, self.translate_placeholders))
            }
            Err(err) => {
                // Put the connection back so Drop can still roll it back.
                self.conn = Some(conn);
                Err(err)
            }
        }
    }
}

impl<State> SqliteConnection<State> {
    fn wrap(
        conn: PooledConnection<'static, SqliteManager>,
        needs_rollback: bool,
        translate_placeholders: bool,
    ) -> Self {
        Self {
            conn: Some(conn),
            needs_rollback,
            translate_placeholders,
            _state: PhantomData,
        }
    }

    fn take_conn(&mut self) -> Result<PooledConnection<'static, SqliteManager>, SqlRepoError> {
        self.conn
            .take()
            .ok_or_else(|| SqlRepoError::ExecutionError("sqlite connection already taken".into()))
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, SqlRepoError> {
        self.conn
            .as_ref()
            .map(|c| Arc::clone(&**c))
            .ok_or_else(|| SqlRepoError::ExecutionError("sqlite connection already taken".into()))
    }

    #[must_use]
    pub fn translate_placeholders(&self) -> bool {
        self.translate_placeholders
    }

    /// Run a query and collect its rows. Outside a transaction the statement autocommits.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if preparing or executing the query fails.
    pub async fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRepoError> {
        let sql = query.to_owned();
        let converted = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard.prepare_cached(&sql)?;
            build_result_set(&mut stmt, &converted.0)
        })
        .await
    }

    /// Execute a DML statement and return the number of rows affected.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if preparing or executing the statement fails.
    pub async fn dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlRepoError> {
        let sql = query.to_owned();
        let converted = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard.prepare_cached(&sql)?;
            Ok(stmt.execute(&converted.as_refs()[..])?)
        })
        .await
    }

    /// Execute a batch of parameterless statements.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if any statement fails.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlRepoError> {
        let sql = sql.to_owned();
        run_blocking(self.conn_handle()?, move |guard| {
            guard.execute_batch(&sql).map_err(SqlRepoError::SqliteError)
        })
        .await
    }
}

impl<State> Drop for SqliteConnection<State> {
    fn drop(&mut self) {
        if !self.needs_rollback {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        let handle = Arc::clone(&*conn);
        // Uncontended unless a cancelled statement is still running on the blocking pool.
        if let Ok(guard) = handle.try_lock() {
            if let Err(e) = guard.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "sqlite rollback on drop failed");
            }
            return;
        }
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn_blocking(move || {
                let guard = handle.blocking_lock();
                if let Err(e) = guard.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %e, "sqlite rollback on drop failed");
                }
                drop(guard);
                drop(conn);
            });
        }
    }
}
