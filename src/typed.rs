//! Backend-neutral connection layer.
//!
//! `AnyIdle` is a checked-out connection outside a transaction; `begin` turns it into an
//! `AnyTx`, and `commit`/`rollback` turn it back. Both implement [`TypedConnOps`], so helpers
//! can be written once for either state.

pub mod any;
pub mod traits;

pub use any::{AnyIdle, AnyTx};
pub use traits::{BeginTx, TxConn, TypedConnOps};
