//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_repository::prelude::*;
//! ```

pub use crate::config::RepoConfig;
pub use crate::error::SqlRepoError;
pub use crate::model::{FromRow, FromValue, Model};
pub use crate::pool::ConfigAndPool;
pub use crate::query_builder::{QueryBuilder, Queryable};
pub use crate::repository::{CommitMode, Repository};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::translation::{PlaceholderStyle, QueryOptions, TranslationMode};
pub use crate::tx_outcome::TxOutcome;
pub use crate::typed::{AnyIdle, AnyTx, BeginTx, TxConn, TypedConnOps};
pub use crate::types::{DatabaseType, RowValues};
