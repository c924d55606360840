//! [`SqliteStore`]: schema rebuild, population, enrichment writes and the
//! occurrence read-models behind the aggregate reports.

use std::path::{Path, PathBuf};

use fauna_core::{
  aggregate::{GroupBy, Occurrence, StateIndicators},
  enrich::{CATEGORY_DESCRIPTIONS, StateInfo, TypeLinkReport, unit_type_prefix, unit_types},
  keys::{Key, KeyMap, KeyMaps},
  rewrite::KeyedRecord,
  source::SourceField,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  schema::{REBUILD, SCHEMA_VERSION, dimension_table},
};

// ─── Summaries ───────────────────────────────────────────────────────────────

/// What [`SqliteStore::populate`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
  /// Rows inserted per dimension, in load order.
  pub dimensions: Vec<(SourceField, usize)>,
  /// Risk rows inserted.
  pub facts:      usize,
}

/// What [`SqliteStore::upsert_states`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateUpsert {
  pub inserted: usize,
  pub updated:  usize,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The fauna relational store, backed by a single SQLite file.
///
/// Single writer, single reader. The connection closes when the store is
/// dropped.
pub struct SqliteStore {
  conn: Connection,
  path: Option<PathBuf>,
}

impl SqliteStore {
  /// Open (or create) the store file at `path`. The schema is left as is;
  /// call [`load`](Self::load) to (re)build and fill it.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    Ok(Self { conn, path: Some(path.to_path_buf()) })
  }

  /// Open an in-memory store for tests.
  pub fn open_in_memory() -> Result<Self> {
    Ok(Self { conn: Connection::open_in_memory()?, path: None })
  }

  /// Raw connection, for queries outside the pipeline.
  pub fn connection(&self) -> &Connection { &self.conn }

  fn describe(&self) -> String {
    self
      .path
      .as_ref()
      .map_or_else(|| ":memory:".to_owned(), |p| p.display().to_string())
  }

  pub fn schema_version(&self) -> Result<i64> {
    Ok(self.conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
  }

  /// Fail unless the schema has been built by this version.
  pub fn ensure_schema(&self) -> Result<()> {
    let found = self.schema_version()?;
    if found != SCHEMA_VERSION {
      return Err(Error::SchemaVersion { found, expected: SCHEMA_VERSION });
    }
    Ok(())
  }

  /// Drop and recreate every table, leaving the store unloaded.
  ///
  /// **Destructive**: all previously stored rows are discarded.
  pub fn rebuild_schema(&mut self) -> Result<()> {
    warn!(store = %self.describe(), "rebuilding schema; existing data is discarded");
    let tx = self.conn.transaction()?;
    tx.execute_batch(REBUILD)?;
    tx.commit()?;
    Ok(())
  }

  // ── Load ──────────────────────────────────────────────────────────────────

  /// Rebuild the schema and populate it in a single transaction.
  ///
  /// **Destructive** once committed. On any error the store is left exactly
  /// as it was before the call, previous data included.
  pub fn load(&mut self, maps: &KeyMaps, rows: &[KeyedRecord]) -> Result<LoadSummary> {
    warn!(store = %self.describe(), "rebuilding schema; existing data is discarded");
    let tx = self.conn.transaction()?;
    tx.execute_batch(REBUILD)?;
    let summary = populate_rows(&tx, maps, rows)?;
    tx.commit()?;
    info!(facts = summary.facts, "loaded store");
    Ok(summary)
  }

  /// Insert-or-ignore the `(id, name)` rows of one dimension. Returns the
  /// number of rows actually inserted; rows whose id exists are skipped.
  pub fn insert_dimension(&mut self, field: SourceField, map: &KeyMap) -> Result<usize> {
    let tx = self.conn.transaction()?;
    let inserted = insert_dimension_rows(&tx, field, map)?;
    tx.commit()?;
    Ok(inserted)
  }

  /// Populate a freshly rebuilt store: dimensions first, then one risk row
  /// per source row together with the secondary foreign-key back-fills.
  /// The store is marked loaded only when everything has been written.
  ///
  /// Running this twice on the same store duplicates the risk rows.
  pub fn populate(&mut self, maps: &KeyMaps, rows: &[KeyedRecord]) -> Result<LoadSummary> {
    let tx = self.conn.transaction()?;
    let summary = populate_rows(&tx, maps, rows)?;
    tx.commit()?;
    info!(facts = summary.facts, "populated store");
    Ok(summary)
  }

  // ── Enrichment ────────────────────────────────────────────────────────────

  /// Update the extended attributes of every state already present and
  /// insert the others with the next free id.
  pub fn upsert_states(&mut self, states: &[StateInfo]) -> Result<StateUpsert> {
    let tx = self.conn.transaction()?;
    let mut outcome = StateUpsert::default();
    {
      let mut update = tx.prepare(
        "UPDATE state
            SET full_name = ?1, development_index = ?2, literacy_rate = ?3
          WHERE name = ?4",
      )?;
      let mut insert = tx.prepare(
        "INSERT INTO state (id, name, full_name, development_index, literacy_rate)
         VALUES ((SELECT COALESCE(MAX(id), -1) + 1 FROM state), ?1, ?2, ?3, ?4)",
      )?;

      for s in states {
        let changed = update.execute(params![
          s.full_name,
          s.development_index,
          s.literacy_rate,
          s.abbreviation
        ])?;
        if changed > 0 {
          outcome.updated += 1;
        } else {
          insert.execute(params![
            s.abbreviation,
            s.full_name,
            s.development_index,
            s.literacy_rate
          ])?;
          debug!(state = %s.abbreviation, "state not referenced by any record; inserted");
          outcome.inserted += 1;
        }
      }
    }
    tx.commit()?;
    info!(inserted = outcome.inserted, updated = outcome.updated, "enriched states");
    Ok(outcome)
  }

  /// Attach the fixed descriptions to matching category codes. Returns the
  /// number of categories described; the rest keep no description.
  pub fn describe_categories(&mut self) -> Result<usize> {
    let tx = self.conn.transaction()?;
    let mut described = 0;
    {
      let mut update = tx.prepare("UPDATE category SET description = ?1 WHERE name = ?2")?;
      for (code, description) in CATEGORY_DESCRIPTIONS {
        described += update.execute(params![description, code])?;
      }
    }
    tx.commit()?;
    info!(described, "described categories");
    Ok(described)
  }

  /// Fill the type table and link every conservation unit whose name prefix
  /// is a known type code. Units without a match stay unlinked and are
  /// listed in the report.
  pub fn link_unit_types(&mut self) -> Result<TypeLinkReport> {
    let tx = self.conn.transaction()?;
    let mut report = TypeLinkReport::default();
    {
      let mut insert_type = tx.prepare(
        "INSERT OR REPLACE INTO conservation_unit_type (id, code, name) VALUES (?1, ?2, ?3)",
      )?;
      for t in unit_types() {
        insert_type.execute(params![t.id, t.code, t.name])?;
      }

      let units: Vec<(Key, String)> = tx
        .prepare("SELECT id, name FROM conservation_unit ORDER BY id")?
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

      let mut find_type = tx.prepare("SELECT id FROM conservation_unit_type WHERE code = ?1")?;
      let mut link = tx.prepare("UPDATE conservation_unit SET type_id = ?1 WHERE id = ?2")?;

      report.total = units.len();
      for (id, name) in units {
        let type_id: Option<Key> = match unit_type_prefix(&name) {
          Some(code) => find_type.query_row(params![code], |r| r.get(0)).optional()?,
          None => None,
        };
        match type_id {
          Some(type_id) => {
            link.execute(params![type_id, id])?;
            report.linked += 1;
          }
          None => {
            warn!(unit_id = id, unit = %name, "no conservation unit type for name prefix");
            report.unmatched.push((id, name));
          }
        }
      }
    }
    tx.commit()?;
    info!(linked = report.linked, total = report.total, "linked conservation unit types");
    Ok(report)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `(id, name)` rows of one dimension, by id.
  pub fn dimension_rows(&self, field: SourceField) -> Result<Vec<(Key, Option<String>)>> {
    let sql = format!("SELECT id, name FROM {} ORDER BY id", dimension_table(field));
    let rows = self
      .conn
      .prepare(&sql)?
      .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
      .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
  }

  pub fn risk_count(&self) -> Result<usize> {
    let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM risk", [], |r| r.get(0))?;
    Ok(n as usize)
  }

  /// One occurrence per risk row, grouped by `by` and broken down by
  /// category description, in insertion order. Unresolved links yield
  /// missing values.
  pub fn occurrences(&self, by: GroupBy) -> Result<Vec<Occurrence>> {
    let (group, joins) = match by {
      GroupBy::State => (
        "st.name",
        "LEFT JOIN conservation_unit u ON u.id = r.conservation_unit_id
         LEFT JOIN state st            ON st.id = u.state_id",
      ),
      GroupBy::Class => (
        "k.name",
        "LEFT JOIN species s ON s.id = r.species_id
         LEFT JOIN class k   ON k.id = s.class_id",
      ),
      GroupBy::Division => (
        "d.name",
        "LEFT JOIN species s  ON s.id = r.species_id
         LEFT JOIN division d ON d.id = s.division_id",
      ),
      GroupBy::UnitType => (
        "t.name",
        "LEFT JOIN conservation_unit u      ON u.id = r.conservation_unit_id
         LEFT JOIN conservation_unit_type t ON t.id = u.type_id",
      ),
    };

    let sql = format!(
      "SELECT {group}, c.description
       FROM risk r
       LEFT JOIN category c ON c.id = r.category_id
       {joins}
       ORDER BY r.rowid"
    );

    let rows = self
      .conn
      .prepare(&sql)?
      .query_map([], |r| {
        Ok(Occurrence { group: r.get(0)?, breakdown: r.get(1)? })
      })?
      .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
  }

  /// States whose development index and literacy rate are both known.
  pub fn state_indicators(&self) -> Result<Vec<StateIndicators>> {
    let rows = self
      .conn
      .prepare(
        "SELECT name, development_index, literacy_rate
         FROM state
         WHERE development_index IS NOT NULL AND literacy_rate IS NOT NULL
         ORDER BY id",
      )?
      .query_map([], |r| {
        Ok(StateIndicators {
          state:             r.get(0)?,
          development_index: r.get(1)?,
          literacy_rate:     r.get(2)?,
        })
      })?
      .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
  }
}

/// The load body shared by [`SqliteStore::load`] and
/// [`SqliteStore::populate`]. Sets the schema version last.
fn populate_rows(
  conn: &Connection,
  maps: &KeyMaps,
  rows: &[KeyedRecord],
) -> Result<LoadSummary> {
  let mut summary = LoadSummary::default();

  for field in SourceField::ALL {
    let inserted = insert_dimension_rows(conn, field, maps.get(field))?;
    debug!(%field, inserted, "inserted dimension rows");
    summary.dimensions.push((field, inserted));
  }

  let mut insert_risk = conn.prepare(
    "INSERT INTO risk (species_id, category_id, conservation_unit_id)
     VALUES (?1, ?2, ?3)",
  )?;
  let mut link_species = conn.prepare(
    "UPDATE species
        SET division_id = ?1, class_id = ?2, order_id = ?3, family_id = ?4
      WHERE id = ?5",
  )?;
  let mut link_family = conn.prepare("UPDATE family SET order_id = ?1 WHERE id = ?2")?;
  let mut link_order = conn.prepare("UPDATE taxon_order SET class_id = ?1 WHERE id = ?2")?;
  let mut link_unit = conn.prepare("UPDATE conservation_unit SET state_id = ?1 WHERE id = ?2")?;

  for row in rows {
    check_keys(row, maps)?;
    summary.facts +=
      insert_risk.execute(params![row.species, row.category, row.conservation_unit])?;
    link_species.execute(params![
      row.division,
      row.class,
      row.order,
      row.family,
      row.species
    ])?;
    link_family.execute(params![row.order, row.family])?;
    link_order.execute(params![row.class, row.order])?;
    link_unit.execute(params![row.state, row.conservation_unit])?;
  }

  conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  Ok(summary)
}

/// Every key of `row` must name a row of its dimension.
fn check_keys(row: &KeyedRecord, maps: &KeyMaps) -> Result<()> {
  for field in SourceField::ALL {
    if let Some(&key) = row.get(field)
      && maps.get(field).name_of(key).is_none()
    {
      return Err(
        fauna_core::Error::UnmappedValue { field, value: key.to_string() }.into(),
      );
    }
  }
  Ok(())
}

fn insert_dimension_rows(
  conn: &Connection,
  field: SourceField,
  map: &KeyMap,
) -> rusqlite::Result<usize> {
  let sql = format!(
    "INSERT OR IGNORE INTO {} (id, name) VALUES (?1, ?2)",
    dimension_table(field)
  );
  let mut stmt = conn.prepare(&sql)?;
  let mut inserted = 0;
  for (key, name) in map.iter() {
    inserted += stmt.execute(params![key, name])?;
  }
  Ok(inserted)
}
