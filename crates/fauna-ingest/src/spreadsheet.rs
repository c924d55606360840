//! Spreadsheet → [`SourceTable`].
//!
//! The first row of the sheet is the header; it is resolved against a
//! [`SourceSchema`] so every later row is read by column name.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use fauna_core::source::{SourceSchema, SourceTable};
use tracing::info;

use crate::{Error, Result};

/// Load `sheet` (the first sheet when `None`) of the workbook at `path`.
///
/// Any format calamine recognises is accepted (xlsx, xls, xlsb, ods).
pub fn load(
  path: impl AsRef<Path>,
  sheet: Option<&str>,
  schema: &SourceSchema,
) -> Result<SourceTable> {
  let path = path.as_ref();
  let mut workbook = open_workbook_auto(path)?;

  let sheet_name = match sheet {
    Some(name) => name.to_owned(),
    None => workbook
      .sheet_names()
      .first()
      .cloned()
      .ok_or_else(|| Error::MissingSheet("<first>".into()))?,
  };
  if !workbook.sheet_names().contains(&sheet_name) {
    return Err(Error::MissingSheet(sheet_name));
  }

  let range = workbook.worksheet_range(&sheet_name)?;
  let mut rows = range.rows();
  let header: Vec<String> = rows
    .next()
    .ok_or_else(|| Error::EmptySheet(sheet_name.clone()))?
    .iter()
    .map(|c| cell_text(c).unwrap_or_default())
    .collect();
  let body: Vec<Vec<Option<String>>> =
    rows.map(|row| row.iter().map(cell_text).collect()).collect();

  let table = table_from_rows(&header, &body, schema)?;
  info!(
    path = %path.display(),
    sheet = %sheet_name,
    rows = table.len(),
    "loaded source spreadsheet"
  );
  Ok(table)
}

/// Build a table from an already-decoded header and body. Rows with every
/// schema cell missing (trailing blank lines) are dropped.
pub fn table_from_rows<S: AsRef<str>>(
  header: &[S],
  body: &[Vec<Option<String>>],
  schema: &SourceSchema,
) -> Result<SourceTable> {
  let index = schema.resolve(header)?;
  let records = body
    .iter()
    .map(|row| index.record(row))
    .filter(|record| *record != Default::default())
    .collect();
  Ok(SourceTable::new(records))
}

/// Cell contents as trimmed text. Empty cells, blank strings and error
/// cells are missing; integral floats print without a fraction.
pub fn cell_text(cell: &Data) -> Option<String> {
  let text = match cell {
    Data::Empty | Data::Error(_) => return None,
    Data::String(s) => s.trim().to_owned(),
    Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
    Data::Float(f) => f.to_string(),
    Data::Int(i) => i.to_string(),
    Data::Bool(b) => b.to_string(),
    other => other.to_string().trim().to_owned(),
  };
  (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
  use fauna_core::source::SourceField;

  use super::*;

  fn header() -> Vec<&'static str> {
    vec![
      "Divisão",
      "Classe",
      "Ordem",
      "Família",
      "Espécie",
      "Categoria",
      "Unidade de Conservação",
      "UF",
    ]
  }

  fn row(cells: [&str; 8]) -> Vec<Option<String>> {
    cells
      .iter()
      .map(|c| (!c.is_empty()).then(|| c.to_string()))
      .collect()
  }

  #[test]
  fn cell_text_normalises_values() {
    assert_eq!(cell_text(&Data::Empty), None);
    assert_eq!(cell_text(&Data::String("   ".into())), None);
    assert_eq!(cell_text(&Data::String(" Aves ".into())), Some("Aves".into()));
    assert_eq!(cell_text(&Data::Float(12.0)), Some("12".into()));
    assert_eq!(cell_text(&Data::Float(0.5)), Some("0.5".into()));
    assert_eq!(cell_text(&Data::Int(7)), Some("7".into()));
  }

  #[test]
  fn rows_become_records() {
    let body = vec![
      row([
        "Aves",
        "Aves",
        "Accipitriformes",
        "Accipitridae",
        "Harpia harpyja",
        "VU",
        "PARNA do Itatiaia",
        "MG/RJ",
      ]),
      row(["Mamíferos", "Mammalia", "Carnivora", "Felidae", "Panthera onca", "VU", "", ""]),
      row(["", "", "", "", "", "", "", ""]),
    ];
    let table = table_from_rows(&header(), &body, &SourceSchema::default()).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.records[0].text(SourceField::State), Some("MG/RJ"));
    assert_eq!(table.records[1].text(SourceField::Family), Some("Felidae"));
    assert_eq!(table.records[1].text(SourceField::ConservationUnit), None);
  }

  /// Two sheets: `Fauna` (header plus two records, with extra columns) and
  /// an empty `Vazia`.
  const WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fauna.xlsx");

  #[test]
  fn load_reads_first_sheet_by_default() {
    let table = load(WORKBOOK, None, &SourceSchema::default()).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.records[0].text(SourceField::Division), Some("Aves"));
    assert_eq!(table.records[0].text(SourceField::State), Some("MG/RJ"));
    assert_eq!(table.records[1].text(SourceField::Species), Some("Panthera onca"));
    assert_eq!(table.records[1].text(SourceField::ConservationUnit), None);
    assert_eq!(table.records[1].text(SourceField::State), None);
  }

  #[test]
  fn load_reads_named_sheet() {
    let table = load(WORKBOOK, Some("Fauna"), &SourceSchema::default()).unwrap();
    assert_eq!(table.records[1].text(SourceField::Category), Some("CR"));
  }

  #[test]
  fn load_unknown_sheet() {
    let err = load(WORKBOOK, Some("Planilha9"), &SourceSchema::default()).unwrap_err();
    assert!(matches!(err, Error::MissingSheet(ref s) if s == "Planilha9"));
  }

  #[test]
  fn load_sheet_without_header() {
    let err = load(WORKBOOK, Some("Vazia"), &SourceSchema::default()).unwrap_err();
    assert!(matches!(err, Error::EmptySheet(ref s) if s == "Vazia"));
  }

  #[test]
  fn load_missing_file() {
    let path = std::env::temp_dir().join("fauna-no-such-workbook.xlsx");
    let err = load(&path, None, &SourceSchema::default()).unwrap_err();
    assert!(matches!(err, Error::Spreadsheet(_)));
  }

  #[test]
  fn missing_header_is_reported() {
    let header = header();
    let err = table_from_rows(&header[..7], &[], &SourceSchema::default()).unwrap_err();
    assert!(matches!(err, Error::Core(fauna_core::Error::MissingColumn(ref c)) if c == "UF"));
  }
}
