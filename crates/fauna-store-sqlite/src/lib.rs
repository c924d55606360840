//! SQLite backend for the fauna risk schema.
//!
//! Owns one [`rusqlite::Connection`]; every multi-statement write runs in a
//! transaction that rolls back if dropped before commit.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::{SCHEMA_VERSION, dimension_table};
pub use store::{LoadSummary, SqliteStore, StateUpsert};
