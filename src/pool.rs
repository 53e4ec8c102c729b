use std::time::Duration;

use crate::error::SqlRepoError;
use crate::translation::PlaceholderStyle;
use crate::typed::AnyIdle;
use crate::typed::any::style_for;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres::{PgConnection, PgManager};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteConnection, SqliteManager};

pub(crate) const DEFAULT_MAX_SIZE: u32 = 10;
pub(crate) const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection pool for one of the supported backends.
#[derive(Clone)]
pub enum RepoPool {
    #[cfg(feature = "postgres")]
    Postgres(bb8::Pool<PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
}

impl std::fmt::Debug for RepoPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

/// A pool plus the settings every connection checked out of it inherits.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    pub pool: RepoPool,
    pub db_type: DatabaseType,
    /// Default for translating `$N`/`?N` in caller-supplied SQL.
    pub translate_placeholders: bool,
}

impl ConfigAndPool {
    /// Check out an idle connection.
    ///
    /// # Errors
    /// Returns `SqlRepoError::ConnectionError` if the pool cannot hand out a connection in time.
    pub async fn checkout(&self) -> Result<AnyIdle, SqlRepoError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            RepoPool::Postgres(pool) => Ok(AnyIdle::Postgres(
                PgConnection::from_pool(pool, self.translate_placeholders).await?,
            )),
            #[cfg(feature = "sqlite")]
            RepoPool::Sqlite(pool) => Ok(AnyIdle::Sqlite(
                SqliteConnection::from_pool(pool, self.translate_placeholders).await?,
            )),
        }
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        style_for(self.db_type)
    }
}
