//! Input decoding for the fauna pipeline.
//!
//! [`spreadsheet`] reads the risk spreadsheet into a
//! [`SourceTable`](fauna_core::source::SourceTable); [`reference`] fetches the
//! external state table and extracts its rows. Blocking I/O only.

pub mod error;
pub mod reference;
pub mod spreadsheet;

pub use error::{Error, Result};
