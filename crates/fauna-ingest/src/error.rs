//! Error type for `fauna-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] fauna_core::Error),

  #[error("spreadsheet error: {0}")]
  Spreadsheet(#[from] calamine::Error),

  #[error("workbook has no sheet named {0:?}")]
  MissingSheet(String),

  #[error("sheet {0:?} has no header row")]
  EmptySheet(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The match substring selected zero or several tables.
  #[error("expected exactly one table containing {needle:?}, found {matched}")]
  TableMatch { needle: String, matched: usize },

  #[error("reference table has no {0:?} column")]
  MissingHeader(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
