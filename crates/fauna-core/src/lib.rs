//! Core types and algorithms for the fauna risk pipeline.
//!
//! Everything here is pure: the source-table model, surrogate key extraction,
//! foreign-key rewriting, the enrichment parsing rules and the aggregator.
//! Spreadsheet and HTML decoding live in `fauna-ingest`; persistence lives in
//! `fauna-store-sqlite`.

pub mod aggregate;
pub mod enrich;
pub mod error;
pub mod keys;
pub mod rewrite;
pub mod source;

pub use error::{Error, Result};
