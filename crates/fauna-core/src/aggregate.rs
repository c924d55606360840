//! Grouped occurrence counts.
//!
//! [`aggregate`] turns a flat list of occurrences into a cross tabulation:
//! one row per group, one column per breakdown value, plus a total per row.
//!
//! # Composite groups
//!
//! A group value such as `"MG/RJ"` names every group the occurrence belongs
//! to. The occurrence is counted once in *each* constituent row, so the sum of
//! all row totals can exceed the number of occurrences. This is deliberate:
//! a risk record listed under several states is a risk record for each of
//! them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Label of the per-row total.
pub const TOTAL: &str = "Total";

/// Breakdown bucket for occurrences with no breakdown value.
pub const UNSPECIFIED: &str = "Não Informado";

/// Separator between the codes of a composite group value.
pub const GROUP_SEPARATOR: char = '/';

/// The categorical dimension occurrences are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
  State,
  Class,
  Division,
  UnitType,
}

impl GroupBy {
  pub const ALL: [GroupBy; 4] = [Self::State, Self::Class, Self::Division, Self::UnitType];

  /// Column heading for the group dimension.
  pub fn label(self) -> &'static str {
    match self {
      Self::State => "UF",
      Self::Class => "Classe",
      Self::Division => "Divisão",
      Self::UnitType => "Tipo de UC",
    }
  }
}

/// One observed occurrence: the group it falls in and its breakdown value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
  pub group:     Option<String>,
  pub breakdown: Option<String>,
}

impl Occurrence {
  pub fn new(group: Option<&str>, breakdown: Option<&str>) -> Self {
    Self {
      group:     group.map(str::to_owned),
      breakdown: breakdown.map(str::to_owned),
    }
  }
}

/// Counts for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
  pub group:  String,
  pub total:  u64,
  pub counts: BTreeMap<String, u64>,
}

impl GroupCounts {
  fn new(group: String) -> Self {
    Self { group, total: 0, counts: BTreeMap::new() }
  }

  /// Count for one breakdown value; zero when never seen in this group.
  pub fn count(&self, breakdown: &str) -> u64 {
    self.counts.get(breakdown).copied().unwrap_or(0)
  }

  fn bump(&mut self, breakdown: &str) {
    *self.counts.entry(breakdown.to_owned()).or_default() += 1;
    self.total += 1;
  }
}

/// A cross tabulation of occurrence counts.
///
/// Rows and columns keep first-seen order. Every row has a cell for every
/// column, and each row's `total` equals the sum of its cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossTab {
  pub columns: Vec<String>,
  pub rows:    Vec<GroupCounts>,
}

impl CrossTab {
  pub fn row(&self, group: &str) -> Option<&GroupCounts> {
    self.rows.iter().find(|r| r.group == group)
  }

  /// Rows by descending total; ties by group name.
  pub fn sorted_by_total(mut self) -> Self {
    self
      .rows
      .sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.group.cmp(&b.group)));
    self
  }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// Split a group value into its constituent codes, without repeats.
pub fn group_codes(group: &str) -> Vec<&str> {
  let mut codes: Vec<&str> = Vec::new();
  for code in group.split(GROUP_SEPARATOR).map(str::trim) {
    if !code.is_empty() && !codes.contains(&code) {
      codes.push(code);
    }
  }
  codes
}

/// Count occurrences per group and breakdown value.
///
/// Occurrences without a group are dropped. A missing breakdown is counted
/// under [`UNSPECIFIED`].
pub fn aggregate(occurrences: impl IntoIterator<Item = Occurrence>) -> CrossTab {
  let mut rows: Vec<GroupCounts> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut columns: Vec<String> = Vec::new();

  for occurrence in occurrences {
    let Some(group) = occurrence.group.as_deref() else {
      continue;
    };
    let codes = group_codes(group);
    if codes.is_empty() {
      continue;
    }

    let breakdown = occurrence.breakdown.as_deref().unwrap_or(UNSPECIFIED);
    if !columns.iter().any(|c| c == breakdown) {
      columns.push(breakdown.to_owned());
    }

    for code in codes {
      let i = *index.entry(code.to_owned()).or_insert_with(|| {
        rows.push(GroupCounts::new(code.to_owned()));
        rows.len() - 1
      });
      rows[i].bump(breakdown);
    }
  }

  for row in &mut rows {
    for column in &columns {
      row.counts.entry(column.clone()).or_insert(0);
    }
  }

  CrossTab { columns, rows }
}

// ─── Indicators ──────────────────────────────────────────────────────────────

/// Socio-economic indicators stored for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateIndicators {
  pub state:             String,
  pub development_index: f64,
  pub literacy_rate:     f64,
}

/// A state's indicators next to its occurrence total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
  pub state:             String,
  pub total:             u64,
  pub development_index: f64,
  pub literacy_rate:     f64,
}

/// Pair each state's indicators with its total in `by_state`, ordered by
/// literacy rate, highest first. States absent from `by_state` get zero.
pub fn join_indicators(
  by_state: &CrossTab,
  indicators: Vec<StateIndicators>,
) -> Vec<IndicatorRow> {
  let mut rows: Vec<IndicatorRow> = indicators
    .into_iter()
    .map(|i| IndicatorRow {
      total:             by_state.row(&i.state).map_or(0, |r| r.total),
      state:             i.state,
      development_index: i.development_index,
      literacy_rate:     i.literacy_rate,
    })
    .collect();
  rows.sort_by(|a, b| {
    b.literacy_rate
      .total_cmp(&a.literacy_rate)
      .then_with(|| a.state.cmp(&b.state))
  });
  rows
}

#[cfg(test)]
mod tests {
  use super::*;

  fn occ(group: Option<&str>, breakdown: Option<&str>) -> Occurrence {
    Occurrence::new(group, breakdown)
  }

  fn assert_totals_consistent(tab: &CrossTab) {
    for row in &tab.rows {
      assert_eq!(row.total, row.counts.values().sum::<u64>(), "row {}", row.group);
      assert_eq!(row.counts.len(), tab.columns.len(), "row {}", row.group);
    }
  }

  #[test]
  fn composite_group_example() {
    let tab = aggregate([
      occ(Some("MG"), Some("CR")),
      occ(Some("MG"), Some("VU")),
      occ(Some("MG/RJ"), Some("CR")),
    ]);

    let mg = tab.row("MG").unwrap();
    assert_eq!(mg.total, 3);
    assert_eq!(mg.count("CR"), 2);
    assert_eq!(mg.count("VU"), 1);

    let rj = tab.row("RJ").unwrap();
    assert_eq!(rj.total, 1);
    assert_eq!(rj.count("CR"), 1);
    assert_eq!(rj.count("VU"), 0);

    assert_eq!(tab.columns, ["CR", "VU"]);
    assert!(tab.row("MG/RJ").is_none());
    assert_totals_consistent(&tab);
  }

  #[test]
  fn composite_fans_out_to_each_group() {
    let before = aggregate([occ(Some("MG"), Some("Vulnerável")), occ(Some("RJ"), Some("EN"))]);
    let after = aggregate([
      occ(Some("MG"), Some("Vulnerável")),
      occ(Some("RJ"), Some("EN")),
      occ(Some("MG/RJ"), Some("Vulnerável")),
    ]);

    for state in ["MG", "RJ"] {
      let b = before.row(state).unwrap();
      let a = after.row(state).unwrap();
      assert_eq!(a.total, b.total + 1);
      assert_eq!(a.count("Vulnerável"), b.count("Vulnerável") + 1);
    }
  }

  #[test]
  fn repeated_code_in_composite_counts_once() {
    let tab = aggregate([occ(Some("SP/ SP/"), Some("EN"))]);
    assert_eq!(tab.rows.len(), 1);
    assert_eq!(tab.row("SP").unwrap().total, 1);
  }

  #[test]
  fn missing_group_excluded_missing_breakdown_bucketed() {
    let tab = aggregate([
      occ(None, Some("CR")),
      occ(Some("BA"), None),
      occ(Some("BA"), Some("EN")),
      occ(Some("  "), Some("EN")),
    ]);

    assert_eq!(tab.rows.len(), 1);
    let ba = tab.row("BA").unwrap();
    assert_eq!(ba.total, 2);
    assert_eq!(ba.count(UNSPECIFIED), 1);
    assert_eq!(ba.count("EN"), 1);
    assert_eq!(ba.count("CR"), 0);
    assert_totals_consistent(&tab);
  }

  #[test]
  fn first_seen_row_order_and_sorting() {
    let tab = aggregate([
      occ(Some("Aves"), Some("EN")),
      occ(Some("Mammalia"), Some("CR")),
      occ(Some("Mammalia"), Some("CR")),
      occ(Some("Amphibia"), Some("VU")),
      occ(Some("Aves"), Some("VU")),
    ]);
    let order: Vec<&str> = tab.rows.iter().map(|r| r.group.as_str()).collect();
    assert_eq!(order, ["Aves", "Mammalia", "Amphibia"]);

    let sorted = tab.sorted_by_total();
    let order: Vec<&str> = sorted.rows.iter().map(|r| r.group.as_str()).collect();
    assert_eq!(order, ["Aves", "Mammalia", "Amphibia"]);
    assert_totals_consistent(&sorted);
  }

  #[test]
  fn empty_input() {
    let tab = aggregate(std::iter::empty());
    assert!(tab.is_empty());
    assert!(tab.columns.is_empty());
  }

  #[test]
  fn indicators_joined_and_ordered_by_literacy() {
    let tab = aggregate([
      occ(Some("MG"), Some("CR")),
      occ(Some("MG/RJ"), Some("CR")),
    ]);
    let rows = join_indicators(&tab, vec![
      StateIndicators { state: "MG".into(), development_index: 0.731, literacy_rate: 92.3 },
      StateIndicators { state: "AC".into(), development_index: 0.663, literacy_rate: 85.1 },
      StateIndicators { state: "RJ".into(), development_index: 0.761, literacy_rate: 96.1 },
    ]);

    let order: Vec<(&str, u64)> = rows.iter().map(|r| (r.state.as_str(), r.total)).collect();
    assert_eq!(order, [("RJ", 1), ("MG", 2), ("AC", 0)]);
  }
}
