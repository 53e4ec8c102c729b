use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use tokio::sync::Mutex;

use crate::error::SqlRepoError;

/// A rusqlite connection shared between the pool and the blocking worker that runs statements.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// bb8 manager opening rusqlite connections against one database path.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConnectionError` if the first connection cannot be opened.
    pub async fn build_pool(
        self,
        max_size: u32,
        connection_timeout: Duration,
    ) -> Result<Pool<SqliteManager>, SqlRepoError> {
        Pool::builder()
            .max_size(max_size)
            .connection_timeout(connection_timeout)
            .build(self)
            .await
            .map_err(|e| SqlRepoError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlRepoError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.path.clone();
        async move {
            tracing::debug!(path = %path, "opening sqlite connection");
            let conn = tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&path)?;
                // journal_mode answers with a row, so it cannot go through execute().
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                Ok::<_, SqlRepoError>(conn)
            })
            .await
            .map_err(|e| SqlRepoError::ConnectionError(format!("sqlite open join error: {e}")))??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard
                    .query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(SqlRepoError::SqliteError)
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Run synchronous rusqlite work on the blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlRepoError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlRepoError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlRepoError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
