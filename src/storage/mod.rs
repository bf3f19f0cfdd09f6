//! Persistent storage for the expert index.
//!
//! - SQLite database holding expert profiles and their vectors
//! - Async-safe database operations via tokio::task::spawn_blocking

mod database;
pub mod queries;
mod schema;

pub use database::{Database, DatabaseError, Result};
