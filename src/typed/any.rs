use std::future::Future;

use super::traits::{BeginTx, TxConn, TypedConnOps};
use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres::{Idle as PgIdle, InTx as PgInTx, PgConnection};
#[cfg(feature = "sqlite")]
use crate::sqlite::{Idle as SqIdle, InTx as SqInTx, SqliteConnection};

/// Backend-neutral idle connection.
pub enum AnyIdle {
    #[cfg(feature = "postgres")]
    Postgres(PgConnection<PgIdle>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection<SqIdle>),
}

/// Backend-neutral connection with an open transaction.
pub enum AnyTx {
    #[cfg(feature = "postgres")]
    Postgres(PgConnection<PgInTx>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection<SqInTx>),
}

impl AnyIdle {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            AnyIdle::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            AnyIdle::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

impl AnyTx {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            AnyTx::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            AnyTx::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

pub(crate) fn style_for(db_type: DatabaseType) -> PlaceholderStyle {
    match db_type {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => PlaceholderStyle::Postgres,
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => PlaceholderStyle::Sqlite,
    }
}

// One dispatch macro per wrapper keeps the per-backend arms identical across operations.
macro_rules! dispatch {
    ($wrapper:ident, $self:expr, $conn:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "postgres")]
            $wrapper::Postgres($conn) => $body,
            #[cfg(feature = "sqlite")]
            $wrapper::Sqlite($conn) => $body,
        }
    };
}

impl TypedConnOps for AnyIdle {
    fn placeholder_style(&self) -> PlaceholderStyle {
        style_for(self.database_type())
    }

    fn translation_default(&self) -> bool {
        dispatch!(AnyIdle, self, conn => conn.translate_placeholders())
    }

    fn execute_batch(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<(), SqlRepoError>> + Send {
        async move { dispatch!(AnyIdle, self, conn => conn.execute_batch(sql).await) }
    }

    fn dml(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<usize, SqlRepoError>> + Send {
        async move { dispatch!(AnyIdle, self, conn => conn.dml(query, params).await) }
    }

    fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<ResultSet, SqlRepoError>> + Send {
        async move { dispatch!(AnyIdle, self, conn => conn.select(query, params).await) }
    }
}

impl TypedConnOps for AnyTx {
    fn placeholder_style(&self) -> PlaceholderStyle {
        style_for(self.database_type())
    }

    fn translation_default(&self) -> bool {
        dispatch!(AnyTx, self, conn => conn.translate_placeholders())
    }

    fn execute_batch(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<(), SqlRepoError>> + Send {
        async move { dispatch!(AnyTx, self, conn => conn.execute_batch(sql).await) }
    }

    fn dml(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<usize, SqlRepoError>> + Send {
        async move { dispatch!(AnyTx, self, conn => conn.dml(query, params).await) }
    }

    fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<ResultSet, SqlRepoError>> + Send {
        async move { dispatch!(AnyTx, self, conn => conn.select(query, params).await) }
    }
}

impl BeginTx for AnyIdle {
    type Tx = AnyTx;

    fn begin(self) -> impl Future<Output = Result<AnyTx, SqlRepoError>> + Send {
        async move {
            match self {
                #[cfg(feature = "postgres")]
                AnyIdle::Postgres(conn) => Ok(AnyTx::Postgres(conn.begin().await?)),
                #[cfg(feature = "sqlite")]
                AnyIdle::Sqlite(conn) => Ok(AnyTx::Sqlite(conn.begin().await?)),
            }
        }
    }
}

impl TxConn for AnyTx {
    type Idle = AnyIdle;

    fn commit(self) -> impl Future<Output = Result<AnyIdle, SqlRepoError>> + Send {
        async move {
            match self {
                #[cfg(feature = "postgres")]
                AnyTx::Postgres(conn) => Ok(AnyIdle::Postgres(conn.commit().await?)),
                #[cfg(feature = "sqlite")]
                AnyTx::Sqlite(conn) => Ok(AnyIdle::Sqlite(conn.commit().await?)),
            }
        }
    }

    fn rollback(self) -> impl Future<Output = Result<AnyIdle, SqlRepoError>> + Send {
        async move {
            match self {
                #[cfg(feature = "postgres")]
                AnyTx::Postgres(conn) => Ok(AnyIdle::Postgres(conn.rollback().await?)),
                #[cfg(feature = "sqlite")]
                AnyTx::Sqlite(conn) => Ok(AnyIdle::Sqlite(conn.rollback().await?)),
            }
        }
    }
}
