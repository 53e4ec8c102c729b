//! `PostgreSQL` backend: tokio-postgres clients pooled with bb8.

pub mod connection;
pub mod config;
pub mod manager;
pub mod params;
pub mod query;

pub use connection::{Idle, InTx, PgConnection};
pub use config::{PostgresOptions, PostgresOptionsBuilder, validate_postgres_config};
pub use manager::PgManager;
pub use params::Params;
pub use query::build_result_set;
