use std::marker::PhantomData;

use bb8::{Pool, PooledConnection};
use tokio::runtime::Handle;

use super::manager::PgManager;
use super::query::{execute_on_client, query_on_client};
use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Marker types for typestate
pub enum Idle {}
pub enum InTx {}

/// Typestate wrapper around a pooled Postgres client.
///
/// Transactions are driven with plain `BEGIN`/`COMMIT`/`ROLLBACK` so the pooled client can be
/// owned across the whole transaction. Dropping a `PgConnection<InTx>` spawns a `ROLLBACK`
/// on the runtime that began the transaction; the client returns to the pool only after it.
pub struct PgConnection<State> {
    conn: Option<PooledConnection<'static, PgManager>>,
    needs_rollback: bool,
    runtime: Option<Handle>,
    translate_placeholders: bool,
    _state: PhantomData<State>,
}

impl PgConnection<Idle> {
    /// Checkout a connection from the pool.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConnectionError` if no connection could be checked out.
    pub async fn from_pool(
        pool: &Pool<PgManager>,
        translate_placeholders: bool,
    ) -> Result<Self, SqlRepoError> {
        let conn = pool
            .get_owned()
            .await
            .map_err(|e| SqlRepoError::ConnectionError(format!("postgres checkout error: {e}")))?;
        Ok(Self::wrap(conn, false, translate_placeholders))
    }

    /// Begin an explicit transaction.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `BEGIN` fails.
    pub async fn begin(mut self) -> Result<PgConnection<InTx>, SqlRepoError> {
        let conn = self.take_conn()?;
        conn.simple_query("BEGIN").await?;
        let mut tx = PgConnection::wrap(conn, true, self.translate_placeholders);
        tx.runtime = Handle::try_current().ok();
        Ok(tx)
    }
}

impl PgConnection<InTx> {
    /// Commit and return to idle.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `COMMIT` fails.
    pub async fn commit(self) -> Result<PgConnection<Idle>, SqlRepoError> {
        self.finish("COMMIT").await
    }

    /// Roll back and return to idle.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if `ROLLBACK` fails.
    pub async fn rollback(self) -> Result<PgConnection<Idle>, SqlRepoError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(mut self, sql: &str) -> Result<PgConnection<Idle>, SqlRepoError> {
        let conn = self.take_conn()?;
        match conn.simple_query(sql).await {
            Ok(_) => {
                self.needs_rollback = false;
                Ok(PgConnection::wrap(conn, false, self.translate_placeholders))
            }
            Err(err) => {
                // Keep needs_rollback so Drop retries.
                self.conn = Some(conn);
                Err(err.into())
            }
        }
    }
}

impl<State> PgConnection<State> {
    fn wrap(
        conn: PooledConnection<'static, PgManager>,
        needs_rollback: bool,
        translate_placeholders: bool,
    ) -> Self {
        Self {
            conn: Some(conn),
            needs_rollback,
            runtime: None,
            translate_placeholders,
            _state: PhantomData,
        }
    }

    fn take_conn(&mut self) -> Result<PooledConnection<'static, PgManager>, SqlRepoError> {
        self.conn
            .take()
            .ok_or_else(|| SqlRepoError::ExecutionError("postgres connection already taken".into()))
    }

    fn client(&self) -> Result<&tokio_postgres::Client, SqlRepoError> {
        self.conn
            .as_deref()
            .ok_or_else(|| SqlRepoError::ExecutionError("postgres connection already taken".into()))
    }

    #[must_use]
    pub fn translate_placeholders(&self) -> bool {
        self.translate_placeholders
    }

    /// Run a query and collect its rows.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if execution or decoding fails.
    pub async fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRepoError> {
        query_on_client(self.client()?, query, params).await
    }

    /// Execute DML and return rows affected.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if execution fails.
    pub async fn dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlRepoError> {
        execute_on_client(self.client()?, query, params).await
    }

    /// Execute a batch of parameterless statements.
    ///
    /// # Errors
    /// Returns `SqlRepoError` if execution fails.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlRepoError> {
        self.client()?.batch_execute(sql).await?;
        Ok(())
    }
}

impl<State> Drop for PgConnection<State> {
    fn drop(&mut self) {
        if !self.needs_rollback {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        match self.runtime.take().or_else(|| Handle::try_current().ok()) {
            Some(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.simple_query("ROLLBACK").await {
                        tracing::warn!(error = %e, "postgres rollback on drop failed");
                    }
                });
            }
            None => {
                // Never hand a client with an open transaction back to the pool.
                tracing::warn!("postgres transaction dropped without a runtime; client discarded");
                std::mem::forget(conn);
            }
        }
    }
}
