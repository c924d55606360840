//! External state reference table.
//!
//! The table is one `<table>` of an HTML page, picked by a substring of its
//! text. Its header row names the columns; data rows become
//! [`RawStateRow`]s with the numeric fields left as text for
//! [`fauna_core::enrich`] to normalise.

use std::{path::PathBuf, sync::LazyLock, time::Duration};

use fauna_core::enrich::RawStateRow;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Header labels of the reference table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTableColumns {
  pub abbreviation:      String,
  pub full_name:         String,
  pub development_index: String,
  pub literacy_rate:     String,
}

impl Default for StateTableColumns {
  fn default() -> Self {
    Self {
      abbreviation:      "Abreviação".into(),
      full_name:         "Unidade federativa".into(),
      development_index: "IDH (2010)".into(),
      literacy_rate:     "Alfabetização (2016)".into(),
    }
  }
}

/// Where the reference page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
  Url(String),
  File(PathBuf),
}

// ─── Fetch ───────────────────────────────────────────────────────────────────

const USER_AGENT: &str = concat!("fauna/", env!("CARGO_PKG_VERSION"));

/// Read the page body. A failed request or non-success status is an error.
pub fn read_page(source: &ReferenceSource) -> Result<String> {
  match source {
    ReferenceSource::File(path) => {
      debug!(path = %path.display(), "reading reference page from file");
      Ok(std::fs::read_to_string(path)?)
    }
    ReferenceSource::Url(url) => {
      info!(%url, "fetching reference page");
      let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;
      Ok(client.get(url).send()?.error_for_status()?.text()?)
    }
  }
}

/// Fetch `source` and extract the single table containing `needle`.
pub fn load_state_rows(
  source: &ReferenceSource,
  needle: &str,
  columns: &StateTableColumns,
) -> Result<Vec<RawStateRow>> {
  let html = read_page(source)?;
  let rows = extract_state_rows(&html, needle, columns)?;
  info!(rows = rows.len(), "extracted state reference rows");
  Ok(rows)
}

// ─── Extraction ──────────────────────────────────────────────────────────────

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("th, td"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static FOOTNOTE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("footnote pattern is valid"));

fn selector(css: &str) -> Selector {
  Selector::parse(css).expect("static selector is valid")
}

/// Whitespace-collapsed text of an element, footnote markers removed.
fn element_text(el: ElementRef<'_>) -> String {
  let raw: String = el.text().collect();
  let stripped = FOOTNOTE.replace_all(&raw, "");
  stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exactly one table whose text contains `needle`.
fn match_table<'a>(doc: &'a Html, needle: &str) -> Result<ElementRef<'a>> {
  let matched: Vec<ElementRef<'a>> = doc
    .select(&TABLE)
    .filter(|t| t.text().collect::<String>().contains(needle))
    .collect();
  match matched.as_slice() {
    [table] => Ok(*table),
    _ => Err(Error::TableMatch { needle: needle.to_owned(), matched: matched.len() }),
  }
}

fn column(header: &[String], label: &str) -> Result<usize> {
  header
    .iter()
    .position(|h| h == label.trim())
    .ok_or_else(|| Error::MissingHeader(label.to_owned()))
}

/// Upper bound on `colspan`/`rowspan`, as in the HTML table model.
const MAX_SPAN: usize = 1000;

/// A positive span attribute of a cell, 1 when absent or invalid.
fn span(cell: ElementRef<'_>, attr: &str) -> usize {
  cell
    .value()
    .attr(attr)
    .and_then(|v| v.trim().parse::<usize>().ok())
    .filter(|&n| n > 0)
    .map_or(1, |n| n.min(MAX_SPAN))
}

fn is_header_row(tr: &ElementRef<'_>) -> bool {
  tr.select(&HEADER_CELL).next().is_some() && tr.select(&DATA_CELL).next().is_none()
}

/// Column labels of a (possibly multi-row) header.
///
/// Spans are laid out on a grid; each column takes the label of the lowest
/// header cell covering it, so a group heading above two sub-columns yields
/// the sub-column labels.
fn header_labels(rows: &[ElementRef<'_>]) -> Vec<String> {
  let mut labels: Vec<String> = Vec::new();
  // Rows still covered by a cell spanning down from above, per column.
  let mut covered: Vec<usize> = Vec::new();

  for tr in rows {
    let mut col = 0;
    for cell in tr.select(&CELL) {
      while covered.get(col).is_some_and(|&n| n > 0) {
        covered[col] -= 1;
        col += 1;
      }
      let text = element_text(cell);
      let down = span(cell, "rowspan") - 1;
      for _ in 0..span(cell, "colspan") {
        if col >= labels.len() {
          labels.resize(col + 1, String::new());
          covered.resize(col + 1, 0);
        }
        labels[col] = text.clone();
        covered[col] = down;
        col += 1;
      }
    }
    for n in covered.iter_mut().skip(col) {
      *n = n.saturating_sub(1);
    }
  }
  labels
}

/// Extract the state rows of the one table in `html` containing `needle`.
///
/// The header is the first run of rows made only of `<th>` cells; its
/// `colspan`/`rowspan` are expanded (see [`header_labels`]). Data rows are
/// read cell by cell without span expansion: rows holding a `colspan` cell
/// (notes, sources) are skipped, as are rows with no `<td>`, too few cells,
/// or an empty abbreviation. A `rowspan` inside the data rows is not
/// supported.
pub fn extract_state_rows(
  html: &str,
  needle: &str,
  columns: &StateTableColumns,
) -> Result<Vec<RawStateRow>> {
  let doc = Html::parse_document(html);
  let table = match_table(&doc, needle)?;

  let mut rows = table.select(&ROW).skip_while(|tr| !is_header_row(tr)).peekable();
  let mut header_rows = Vec::new();
  while let Some(tr) = rows.next_if(is_header_row) {
    header_rows.push(tr);
  }
  if header_rows.is_empty() {
    return Err(Error::MissingHeader(columns.abbreviation.clone()));
  }
  let header = header_labels(&header_rows);

  let abbreviation = column(&header, &columns.abbreviation)?;
  let full_name = column(&header, &columns.full_name)?;
  let development_index = column(&header, &columns.development_index)?;
  let literacy_rate = column(&header, &columns.literacy_rate)?;
  let width = abbreviation.max(full_name).max(development_index).max(literacy_rate);

  let mut out = Vec::new();
  for tr in rows {
    if tr.select(&DATA_CELL).next().is_none() {
      continue;
    }
    let spanned = tr.select(&CELL).any(|c| span(c, "colspan") > 1);
    let cells: Vec<String> = tr.select(&CELL).map(element_text).collect();
    if spanned || cells.len() <= width || cells[abbreviation].is_empty() {
      debug!(?cells, "skipping reference row");
      continue;
    }
    out.push(RawStateRow {
      abbreviation:      cells[abbreviation].clone(),
      full_name:         cells[full_name].clone(),
      development_index: cells[development_index].clone(),
      literacy_rate:     cells[literacy_rate].clone(),
    });
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  const PAGE: &str = r#"
    <html><body>
      <table><tr><td>Navegação</td></tr></table>
      <table class="wikitable">
        <tr>
          <th>Bandeira</th><th>Unidade federativa</th><th>Abreviação</th>
          <th>IDH (2010)<sup>[4]</sup></th><th>Alfabetização (2016)</th>
        </tr>
        <tr><td></td><th>Minas  Gerais</th><td>MG</td><td>731</td><td>92,3%</td></tr>
        <tr><td></td><td>Rio de Janeiro</td><td>RJ</td><td>0,761[5]</td><td>96,1%</td></tr>
        <tr><td colspan="5">Fonte: IBGE</td></tr>
      </table>
    </body></html>
  "#;

  #[test]
  fn extracts_rows_by_header_name() {
    let rows = extract_state_rows(PAGE, "Abreviação", &StateTableColumns::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], RawStateRow {
      abbreviation:      "MG".into(),
      full_name:         "Minas Gerais".into(),
      development_index: "731".into(),
      literacy_rate:     "92,3%".into(),
    });
    assert_eq!(rows[1].development_index, "0,761");
  }

  #[test]
  fn no_matching_table_is_an_error() {
    let err = extract_state_rows(PAGE, "Sigla", &StateTableColumns::default()).unwrap_err();
    assert!(matches!(err, Error::TableMatch { matched: 0, .. }));
  }

  #[test]
  fn several_matching_tables_is_an_error() {
    let page = format!("{PAGE}{PAGE}");
    let err = extract_state_rows(&page, "Abreviação", &StateTableColumns::default()).unwrap_err();
    assert!(matches!(err, Error::TableMatch { matched: 2, .. }));
  }

  #[test]
  fn missing_column_is_reported() {
    let columns = StateTableColumns { literacy_rate: "Alfabetização (2020)".into(), ..Default::default() };
    let err = extract_state_rows(PAGE, "Abreviação", &columns).unwrap_err();
    assert!(matches!(err, Error::MissingHeader(ref h) if h == "Alfabetização (2020)"));
  }

  #[test]
  fn grouped_header_is_expanded() {
    let page = r#"
      <table>
        <tr>
          <th colspan="2" rowspan="2">Bandeira</th>
          <th rowspan="2">Unidade federativa</th><th rowspan="2">Abreviação</th>
          <th colspan="2">Indicadores</th>
        </tr>
        <tr><th>IDH (2010)</th><th>Alfabetização (2016)</th></tr>
        <tr><td></td><td>mapa</td><td>Minas Gerais</td><td>MG</td><td>731</td><td>92,3%</td></tr>
        <tr><td colspan="6">Fonte: IBGE</td></tr>
      </table>
    "#;
    let rows = extract_state_rows(page, "Abreviação", &StateTableColumns::default()).unwrap();
    assert_eq!(rows, vec![RawStateRow {
      abbreviation:      "MG".into(),
      full_name:         "Minas Gerais".into(),
      development_index: "731".into(),
      literacy_rate:     "92,3%".into(),
    }]);
  }

  #[test]
  fn header_labels_follow_spans() {
    let doc = Html::parse_fragment(
      "<table>\
         <tr><th rowspan=\"2\">A</th><th colspan=\"2\">G</th><th rowspan=\"2\">D</th></tr>\
         <tr><th>B</th><th>C</th></tr>\
       </table>",
    );
    let rows: Vec<ElementRef<'_>> = doc.select(&ROW).collect();
    assert_eq!(header_labels(&rows), ["A", "B", "C", "D"]);
  }

  #[test]
  fn reads_page_from_file() {
    let path = std::env::temp_dir().join(format!("fauna-ref-{}.html", std::process::id()));
    std::fs::write(&path, PAGE).unwrap();
    let rows = load_state_rows(
      &ReferenceSource::File(path.clone()),
      "Abreviação",
      &StateTableColumns::default(),
    )
    .unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(rows.len(), 2);
  }
}
