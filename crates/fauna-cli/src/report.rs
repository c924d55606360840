//! Aggregate reports and their text rendering.

use std::fmt::Write as _;

use fauna_core::aggregate::{CrossTab, GroupBy, IndicatorRow, TOTAL, aggregate, join_indicators};
use fauna_store_sqlite::SqliteStore;
use serde::Serialize;

/// A rendered-ready report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "report", rename_all = "kebab-case")]
pub enum Report {
  /// Occurrence counts per group and risk category.
  ByGroup { by: GroupBy, table: CrossTab },
  /// State totals next to development index and literacy rate.
  Indicators { rows: Vec<IndicatorRow> },
}

/// Counts grouped by `by`. The state table is ordered by total, the others
/// keep first-seen order.
pub fn by_group(store: &SqliteStore, by: GroupBy) -> fauna_store_sqlite::Result<Report> {
  let table = aggregate(store.occurrences(by)?);
  let table = match by {
    GroupBy::State => table.sorted_by_total(),
    _ => table,
  };
  Ok(Report::ByGroup { by, table })
}

pub fn indicators(store: &SqliteStore) -> fauna_store_sqlite::Result<Report> {
  let by_state = aggregate(store.occurrences(GroupBy::State)?);
  let rows = join_indicators(&by_state, store.state_indicators()?);
  Ok(Report::Indicators { rows })
}

// ─── Text ────────────────────────────────────────────────────────────────────

impl Report {
  pub fn title(&self) -> String {
    match self {
      Self::ByGroup { by, .. } => format!("Espécies ameaçadas por {} e risco", by.label()),
      Self::Indicators { .. } => "Espécies ameaçadas, IDH e alfabetização por UF".to_owned(),
    }
  }

  /// Header and body cells, all as text.
  fn cells(&self) -> (Vec<String>, Vec<Vec<String>>) {
    match self {
      Self::ByGroup { by, table } => {
        let mut header = vec![by.label().to_owned()];
        header.extend(table.columns.iter().cloned());
        header.push(TOTAL.to_owned());
        let body = table
          .rows
          .iter()
          .map(|row| {
            let mut cells = vec![row.group.clone()];
            cells.extend(table.columns.iter().map(|c| row.count(c).to_string()));
            cells.push(row.total.to_string());
            cells
          })
          .collect();
        (header, body)
      }
      Self::Indicators { rows } => {
        let header = ["UF", TOTAL, "IDH", "Alfabetização"]
          .map(str::to_owned)
          .to_vec();
        let body = rows
          .iter()
          .map(|r| {
            vec![
              r.state.clone(),
              r.total.to_string(),
              format!("{:.3}", r.development_index),
              format!("{:.1}", r.literacy_rate),
            ]
          })
          .collect();
        (header, body)
      }
    }
  }

  /// Aligned text table: first column left-aligned, the rest right-aligned.
  pub fn render_text(&self) -> String {
    let (header, body) = self.cells();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
      for (w, cell) in widths.iter_mut().zip(row) {
        *w = (*w).max(cell.chars().count());
      }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", self.title());
    write_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut out, &rule, &widths);
    for row in &body {
      write_row(&mut out, row, &widths);
    }
    out
  }
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
  let mut line = String::new();
  for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
    let pad = width.saturating_sub(cell.chars().count());
    if i == 0 {
      line.push_str(cell);
      line.push_str(&" ".repeat(pad));
    } else {
      line.push_str("  ");
      line.push_str(&" ".repeat(pad));
      line.push_str(cell);
    }
  }
  out.push_str(line.trim_end());
  out.push('\n');
}
