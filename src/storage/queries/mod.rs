//! Database query modules.
//!
//! Plain functions over a borrowed `rusqlite::Connection`, meant to be called
//! inside [`Database::with_conn`](super::Database::with_conn) or a transaction.

pub mod experts;
