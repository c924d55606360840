//! Error types for `fauna-core`.

use thiserror::Error;

use crate::source::SourceField;

#[derive(Debug, Error)]
pub enum Error {
  #[error("column {0:?} not found in source header")]
  MissingColumn(String),

  /// A numeric attribute could not be normalised. Never coerced to a default.
  #[error("malformed {field} value: {value:?}")]
  MalformedNumber { field: &'static str, value: String },

  /// A value has no surrogate key in the map built from the same table.
  #[error("value {value:?} in column {field} has no surrogate key")]
  UnmappedValue { field: SourceField, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
