//! The source table: which spreadsheet columns the pipeline reads, and the
//! records decoded from them.
//!
//! Columns are addressed by header text through a [`SourceSchema`], never by
//! position. A resolved schema ([`ColumnIndex`]) turns one spreadsheet row
//! into one [`SourceRecord`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The eight source columns carried into the relational schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceField {
  Division,
  Class,
  Order,
  Family,
  Species,
  Category,
  ConservationUnit,
  State,
}

impl SourceField {
  /// All fields, in the order their dimensions are loaded.
  pub const ALL: [SourceField; 8] = [
    Self::Division,
    Self::Class,
    Self::Order,
    Self::Family,
    Self::Species,
    Self::Category,
    Self::ConservationUnit,
    Self::State,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Division => "division",
      Self::Class => "class",
      Self::Order => "order",
      Self::Family => "family",
      Self::Species => "species",
      Self::Category => "category",
      Self::ConservationUnit => "conservation_unit",
      Self::State => "state",
    }
  }

  pub(crate) fn index(self) -> usize {
    match self {
      Self::Division => 0,
      Self::Class => 1,
      Self::Order => 2,
      Self::Family => 3,
      Self::Species => 4,
      Self::Category => 5,
      Self::ConservationUnit => 6,
      Self::State => 7,
    }
  }
}

impl fmt::Display for SourceField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One value slot per [`SourceField`]. Any slot may be missing.
///
/// Instantiated as [`SourceRecord`] (raw text) and as
/// [`KeyedRecord`](crate::rewrite::KeyedRecord) (surrogate keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields<T> {
  pub division:          Option<T>,
  pub class:             Option<T>,
  pub order:             Option<T>,
  pub family:            Option<T>,
  pub species:           Option<T>,
  pub category:          Option<T>,
  pub conservation_unit: Option<T>,
  pub state:             Option<T>,
}

impl<T> Fields<T> {
  /// A record with every slot missing.
  pub fn empty() -> Self {
    Self {
      division:          None,
      class:             None,
      order:             None,
      family:            None,
      species:           None,
      category:          None,
      conservation_unit: None,
      state:             None,
    }
  }

  pub fn get(&self, field: SourceField) -> Option<&T> {
    match field {
      SourceField::Division => self.division.as_ref(),
      SourceField::Class => self.class.as_ref(),
      SourceField::Order => self.order.as_ref(),
      SourceField::Family => self.family.as_ref(),
      SourceField::Species => self.species.as_ref(),
      SourceField::Category => self.category.as_ref(),
      SourceField::ConservationUnit => self.conservation_unit.as_ref(),
      SourceField::State => self.state.as_ref(),
    }
  }

  pub fn set(&mut self, field: SourceField, value: Option<T>) {
    let slot = match field {
      SourceField::Division => &mut self.division,
      SourceField::Class => &mut self.class,
      SourceField::Order => &mut self.order,
      SourceField::Family => &mut self.family,
      SourceField::Species => &mut self.species,
      SourceField::Category => &mut self.category,
      SourceField::ConservationUnit => &mut self.conservation_unit,
      SourceField::State => &mut self.state,
    };
    *slot = value;
  }

  /// Map every present slot through `f`, stopping at the first error.
  pub fn try_map<U, E>(
    &self,
    mut f: impl FnMut(SourceField, &T) -> Result<U, E>,
  ) -> Result<Fields<U>, E> {
    let mut out = Fields::empty();
    for field in SourceField::ALL {
      if let Some(value) = self.get(field) {
        out.set(field, Some(f(field, value)?));
      }
    }
    Ok(out)
  }
}

impl<T> Default for Fields<T> {
  fn default() -> Self { Self::empty() }
}

/// A spreadsheet row reduced to the fields the pipeline reads.
pub type SourceRecord = Fields<String>;

impl SourceRecord {
  pub fn text(&self, field: SourceField) -> Option<&str> {
    self.get(field).map(String::as_str)
  }
}

/// The in-memory source table, rows in sheet order.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
  pub records: Vec<SourceRecord>,
}

impl SourceTable {
  pub fn new(records: Vec<SourceRecord>) -> Self { Self { records } }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  /// All values of one column, in row order; missing cells yield `None`.
  pub fn column(
    &self,
    field: SourceField,
  ) -> impl Iterator<Item = Option<&str>> + '_ {
    self.records.iter().map(move |r| r.text(field))
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Header text of the spreadsheet column backing each [`SourceField`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSchema {
  pub division:          String,
  pub class:             String,
  pub order:             String,
  pub family:            String,
  pub species:           String,
  pub category:          String,
  pub conservation_unit: String,
  pub state:             String,
}

impl Default for SourceSchema {
  fn default() -> Self {
    Self {
      division:          "Divisão".into(),
      class:             "Classe".into(),
      order:             "Ordem".into(),
      family:            "Família".into(),
      species:           "Espécie".into(),
      category:          "Categoria".into(),
      conservation_unit: "Unidade de Conservação".into(),
      state:             "UF".into(),
    }
  }
}

impl SourceSchema {
  pub fn header(&self, field: SourceField) -> &str {
    match field {
      SourceField::Division => &self.division,
      SourceField::Class => &self.class,
      SourceField::Order => &self.order,
      SourceField::Family => &self.family,
      SourceField::Species => &self.species,
      SourceField::Category => &self.category,
      SourceField::ConservationUnit => &self.conservation_unit,
      SourceField::State => &self.state,
    }
  }

  /// Locate every configured header in `header_row`.
  ///
  /// Comparison ignores surrounding whitespace. The first matching column
  /// wins when a header is repeated.
  pub fn resolve<S: AsRef<str>>(&self, header_row: &[S]) -> Result<ColumnIndex> {
    let mut positions = [0usize; 8];
    for field in SourceField::ALL {
      let wanted = self.header(field).trim();
      positions[field.index()] = header_row
        .iter()
        .position(|h| h.as_ref().trim() == wanted)
        .ok_or_else(|| Error::MissingColumn(wanted.to_owned()))?;
    }
    Ok(ColumnIndex { positions })
  }
}

/// A [`SourceSchema`] resolved against a concrete header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
  positions: [usize; 8],
}

impl ColumnIndex {
  pub fn position(&self, field: SourceField) -> usize {
    self.positions[field.index()]
  }

  /// Build a record from one row of optional cell texts. Cells past the end
  /// of a short row count as missing.
  pub fn record(&self, row: &[Option<String>]) -> SourceRecord {
    let mut record = SourceRecord::empty();
    for field in SourceField::ALL {
      let cell = row.get(self.position(field)).cloned().flatten();
      record.set(field, cell);
    }
    record
  }
}
