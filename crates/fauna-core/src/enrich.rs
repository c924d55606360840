//! Enrichment rules: reference-table number normalisation, category
//! descriptions and conservation-unit type codes.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result, keys::Key};

// ─── State reference rows ────────────────────────────────────────────────────

/// One row of the external state table, as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStateRow {
  pub abbreviation:      String,
  pub full_name:         String,
  pub development_index: String,
  pub literacy_rate:     String,
}

/// A state row with its numeric attributes normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct StateInfo {
  pub abbreviation:      String,
  pub full_name:         String,
  /// Human development index in `0.0..=1.0`.
  pub development_index: f64,
  /// Literacy rate in percent.
  pub literacy_rate:     f64,
}

impl StateInfo {
  pub fn parse(raw: &RawStateRow) -> Result<Self> {
    Ok(Self {
      abbreviation:      raw.abbreviation.trim().to_owned(),
      full_name:         raw.full_name.trim().to_owned(),
      development_index: parse_development_index(&raw.development_index)?,
      literacy_rate:     parse_literacy_rate(&raw.literacy_rate)?,
    })
  }
}

/// Normalise every row, failing on the first malformed value.
pub fn parse_states(rows: &[RawStateRow]) -> Result<Vec<StateInfo>> {
  rows.iter().map(StateInfo::parse).collect()
}

/// Per-mille scale of development indices published as bare integers.
pub const DEVELOPMENT_INDEX_SCALE: f64 = 1000.0;

/// `"731"` is per-mille and becomes `0.731`; `"0,731"` or `"0.731"` are
/// read as decimals.
pub fn parse_development_index(raw: &str) -> Result<f64> {
  let s = raw.trim();
  if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
    let per_mille: u32 = s.parse().map_err(|_| malformed("development index", raw))?;
    return Ok(f64::from(per_mille) / DEVELOPMENT_INDEX_SCALE);
  }
  parse_decimal(s).ok_or_else(|| malformed("development index", raw))
}

/// `"93,2%"` becomes `93.2`.
pub fn parse_literacy_rate(raw: &str) -> Result<f64> {
  let s = raw.trim();
  let s = s.strip_suffix('%').unwrap_or(s).trim_end();
  parse_decimal(s).ok_or_else(|| malformed("literacy rate", raw))
}

/// A finite decimal, accepting `,` as the decimal separator.
fn parse_decimal(s: &str) -> Option<f64> {
  if s.is_empty() || s.contains(char::is_alphabetic) {
    return None;
  }
  s.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn malformed(field: &'static str, value: &str) -> Error {
  Error::MalformedNumber { field, value: value.to_owned() }
}

// ─── Categories ──────────────────────────────────────────────────────────────

/// Risk category codes and their descriptions.
pub const CATEGORY_DESCRIPTIONS: &[(&str, &str)] = &[
  ("VU", "Vulnerável"),
  ("CR", "Criticamente em Perigo"),
  ("EN", "Em Perigo"),
  ("CR(PEX)", "Provavelmente Extinta"),
  ("RE", "Regionalmente Extinta"),
  ("EX", "Extinta"),
  ("CR(PEW)", "Provavelmente Extinta na Natureza"),
  ("EW", "Extinta na Natureza"),
];

/// Exact-match lookup; unknown codes have no description.
pub fn category_description(code: &str) -> Option<&'static str> {
  CATEGORY_DESCRIPTIONS
    .iter()
    .find(|(c, _)| *c == code)
    .map(|(_, d)| *d)
}

// ─── Conservation unit types ─────────────────────────────────────────────────

/// Conservation unit type codes and names. Codes are unique; two codes may
/// share a name.
pub const UNIT_TYPES: &[(&str, &str)] = &[
  ("APA", "Área de Proteção Ambiental"),
  ("ARIE", "Área de Relevante Interesse Ecológico"),
  ("FLONA", "Floresta Nacional"),
  ("FLOE", "Floresta Estadual"),
  ("FLOM", "Floresta Municipal"),
  ("RESEX", "Reserva Extrativista"),
  ("REFA", "Reserva da Fauna"),
  ("REDES", "Reserva de Desenvolvimento Sustentável"),
  ("RPPN", "Reserva Particular do Patrimônio Natural"),
  ("FLOEX", "Floresta Extrativista"),
  ("ASPE", "Área de Proteção Integral"),
  ("PE", "Parque Estadual"),
  ("PM", "Parque Municipal"),
  ("PARNA", "Parque Nacional"),
  ("FLOREST", "Floresta Estadual"),
  ("MN", "Monumento Natural"),
  ("REVIS", "Refúgio da Vida Silvestre"),
  ("ESEC", "Estação Ecológica"),
  ("Parque", "Parque"),
  ("RDS", "Reserva de Desenvolvimento Sustentável"),
  ("REBIO", "Reserva Biológica"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitType {
  pub id:   Key,
  pub code: String,
  pub name: String,
}

/// [`UNIT_TYPES`] with ids assigned in table order.
pub fn unit_types() -> Vec<UnitType> {
  UNIT_TYPES
    .iter()
    .enumerate()
    .map(|(i, (code, name))| UnitType {
      id:   i as Key,
      code: (*code).to_owned(),
      name: (*name).to_owned(),
    })
    .collect()
}

static UNIT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([^ ]+) .+").expect("unit prefix pattern is valid")
});

/// The leading token of a conservation unit name: the run of non-space
/// characters before the first space. Names without a space-separated
/// remainder have no prefix.
pub fn unit_type_prefix(unit_name: &str) -> Option<&str> {
  UNIT_PREFIX
    .captures(unit_name.trim_start())
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
}

/// Outcome of linking conservation units to their type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeLinkReport {
  pub total:     usize,
  pub linked:    usize,
  /// `(unit id, unit name)` of every unit left without a type.
  pub unmatched: Vec<(Key, String)>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn development_index_per_mille_integer() {
    assert_eq!(parse_development_index("731").unwrap(), 0.731);
    assert_eq!(parse_development_index(" 850 ").unwrap(), 0.85);
  }

  #[test]
  fn development_index_decimal_forms() {
    assert_eq!(parse_development_index("0,731").unwrap(), 0.731);
    assert_eq!(parse_development_index("0.731").unwrap(), 0.731);
  }

  #[test]
  fn literacy_rate_strips_unit_and_decimal_comma() {
    assert_eq!(parse_literacy_rate("93,2%").unwrap(), 93.2);
    assert_eq!(parse_literacy_rate("88.7 %").unwrap(), 88.7);
    assert_eq!(parse_literacy_rate("97").unwrap(), 97.0);
  }

  #[test]
  fn malformed_numbers_fail_fast() {
    for bad in ["", "n/d", "—", "NaN", "inf", "7,3,1", "%"] {
      assert!(
        matches!(parse_literacy_rate(bad), Err(Error::MalformedNumber { .. })),
        "{bad:?} should be rejected"
      );
    }
    assert!(parse_development_index("0,7x").is_err());
    assert!(parse_development_index("99999999999").is_err());
  }

  #[test]
  fn parse_states_stops_on_first_bad_row() {
    let good = RawStateRow {
      abbreviation:      "MG ".into(),
      full_name:         "Minas Gerais".into(),
      development_index: "731".into(),
      literacy_rate:     "92,3%".into(),
    };
    let parsed = parse_states(std::slice::from_ref(&good)).unwrap();
    assert_eq!(parsed[0].abbreviation, "MG");
    assert_eq!(parsed[0].development_index, 0.731);

    let bad = RawStateRow { literacy_rate: "?".into(), ..good.clone() };
    assert!(parse_states(&[good, bad]).is_err());
  }

  #[test]
  fn category_lookup_is_exact() {
    assert_eq!(category_description("VU"), Some("Vulnerável"));
    assert_eq!(category_description("CR(PEW)"), Some("Provavelmente Extinta na Natureza"));
    assert_eq!(category_description("vu"), None);
    assert_eq!(category_description("DD"), None);
  }

  #[test]
  fn unit_prefix_extraction() {
    assert_eq!(unit_type_prefix("PARNA da Serra da Canastra"), Some("PARNA"));
    assert_eq!(unit_type_prefix("Parque Estadual do Ibitipoca"), Some("Parque"));
    assert_eq!(unit_type_prefix("REBIO-Una x"), Some("REBIO-Una"));
    assert_eq!(unit_type_prefix("ESEC"), None);
    assert_eq!(unit_type_prefix("ESEC "), None);
  }

  #[test]
  fn unit_type_codes_are_unique_with_sequential_ids() {
    let types = unit_types();
    assert_eq!(types.len(), UNIT_TYPES.len());
    for (i, t) in types.iter().enumerate() {
      assert_eq!(t.id, i as Key);
      assert_eq!(types.iter().filter(|o| o.code == t.code).count(), 1);
    }
  }
}
