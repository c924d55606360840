//! The load and enrichment stages, wired from settings to store.

use std::path::Path;

use anyhow::{Context as _, bail};
use fauna_core::{
  enrich::{TypeLinkReport, parse_states},
  keys::KeyMaps,
  rewrite::rewrite,
};
use fauna_ingest::{reference, spreadsheet};
use fauna_store_sqlite::{LoadSummary, SqliteStore, StateUpsert};
use tracing::info;

use crate::settings::{PipelineConfig, StatesConfig};

/// Read the spreadsheet and load it into a freshly rebuilt store.
///
/// An existing store file is only replaced when `replace` is set; the
/// rebuild discards everything it held. Rebuild and population commit
/// together, so a failed load leaves the file as it was.
pub fn load(cfg: &PipelineConfig, replace: bool) -> anyhow::Result<LoadSummary> {
  if cfg.store_path.exists() && !replace {
    bail!(
      "store {} already exists; pass --replace to rebuild it (all stored data is discarded)",
      cfg.store_path.display()
    );
  }

  let table = spreadsheet::load(&cfg.spreadsheet_path, cfg.sheet.as_deref(), &cfg.columns)
    .with_context(|| format!("failed to load spreadsheet {}", cfg.spreadsheet_path.display()))?;
  let maps = KeyMaps::extract(&table);
  let rows = rewrite(&table, &maps)?;

  let mut store = open(&cfg.store_path)?;
  let summary = store.load(&maps, &rows).context("failed to load store")?;
  Ok(summary)
}

/// Outcome of [`enrich`].
#[derive(Debug, Clone, Default)]
pub struct EnrichSummary {
  /// `None` when state enrichment was skipped.
  pub states:     Option<StateUpsert>,
  pub categories: usize,
  pub unit_types: TypeLinkReport,
}

/// Run the three enrichment procedures against a loaded store.
///
/// The state table is fetched and fully normalised before anything is
/// written, so a malformed number leaves the store untouched.
pub fn enrich(
  store: &mut SqliteStore,
  states: &StatesConfig,
  skip_states: bool,
) -> anyhow::Result<EnrichSummary> {
  store.ensure_schema().context("store has not been loaded")?;

  let upsert = if skip_states {
    info!("skipping state enrichment");
    None
  } else {
    let source = states.source();
    let raw = reference::load_state_rows(&source, &states.table_match, &states.columns)
      .with_context(|| format!("failed to read state reference table from {source:?}"))?;
    let parsed = parse_states(&raw).context("malformed value in state reference table")?;
    Some(store.upsert_states(&parsed)?)
  };

  let categories = store.describe_categories()?;
  let unit_types = store.link_unit_types()?;
  if !unit_types.unmatched.is_empty() {
    info!(
      unmatched = unit_types.unmatched.len(),
      total = unit_types.total,
      "some conservation units have no recognised type"
    );
  }

  Ok(EnrichSummary { states: upsert, categories, unit_types })
}

/// Open an existing store for reading.
pub fn open_loaded(path: &Path) -> anyhow::Result<SqliteStore> {
  if !path.exists() {
    bail!("store {} does not exist; run `fauna load` first", path.display());
  }
  let store = open(path)?;
  store
    .ensure_schema()
    .with_context(|| format!("store {} has not been loaded", path.display()))?;
  Ok(store)
}

fn open(path: &Path) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(path).with_context(|| format!("failed to open store at {}", path.display()))
}
