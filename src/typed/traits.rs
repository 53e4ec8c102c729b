use std::future::Future;

use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Statement execution shared by idle and transactional connections.
pub trait TypedConnOps: Send {
    /// Native placeholder syntax of the backend.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Whether caller SQL is translated to the native placeholder style by default.
    fn translation_default(&self) -> bool;

    fn execute_batch(&mut self, sql: &str) -> impl Future<Output = Result<(), SqlRepoError>> + Send;

    fn dml(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<usize, SqlRepoError>> + Send;

    fn select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> impl Future<Output = Result<ResultSet, SqlRepoError>> + Send;
}

/// Begin a transaction from an idle connection.
pub trait BeginTx: Sized {
    type Tx: TxConn<Idle = Self>;

    fn begin(self) -> impl Future<Output = Result<Self::Tx, SqlRepoError>> + Send;
}

/// Transaction state that can return to idle.
pub trait TxConn: Sized {
    type Idle;

    fn commit(self) -> impl Future<Output = Result<Self::Idle, SqlRepoError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<Self::Idle, SqlRepoError>> + Send;
}
