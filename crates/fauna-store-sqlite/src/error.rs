//! Error type for `fauna-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("core error: {0}")]
  Core(#[from] fauna_core::Error),

  /// The store has never been built, or was built by an incompatible
  /// version.
  #[error("store schema version is {found}, expected {expected}")]
  SchemaVersion { found: i64, expected: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
