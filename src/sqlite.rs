//! `SQLite` backend: rusqlite connections pooled with bb8, driven from async code through
//! `spawn_blocking`.

pub mod connection;
pub mod config;
pub mod manager;
pub mod params;
pub mod query;

pub use connection::{Idle, InTx, SqliteConnection};
pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use manager::{SharedSqliteConnection, SqliteManager};
pub use query::build_result_set;
