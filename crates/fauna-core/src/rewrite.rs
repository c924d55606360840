//! Foreign-key rewriting: replace raw column text with surrogate keys.

use tracing::info;

use crate::{
  Error, Result,
  keys::{Key, KeyMaps},
  source::{Fields, SourceTable},
};

/// A source row whose values have been replaced by surrogate keys. A missing
/// source value stays missing.
pub type KeyedRecord = Fields<Key>;

/// Rewrite every row of `table` through `maps`.
///
/// `maps` must have been built from `table`; a value without a key is an
/// invariant violation reported as [`Error::UnmappedValue`].
pub fn rewrite(table: &SourceTable, maps: &KeyMaps) -> Result<Vec<KeyedRecord>> {
  let rows = table
    .records
    .iter()
    .map(|record| {
      record.try_map(|field, value| {
        maps.get(field).get(value).ok_or_else(|| Error::UnmappedValue {
          field,
          value: value.clone(),
        })
      })
    })
    .collect::<Result<Vec<_>>>()?;

  info!(rows = rows.len(), "rewrote source values to surrogate keys");
  Ok(rows)
}

/// Reverse of [`rewrite`] for one row.
pub fn resolve<'m>(record: &KeyedRecord, maps: &'m KeyMaps) -> Result<Fields<&'m str>> {
  record.try_map(|field, &key| {
    maps.get(field).name_of(key).ok_or_else(|| Error::UnmappedValue {
      field,
      value: key.to_string(),
    })
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::{SourceField, SourceRecord};

  fn row(species: &str, class: &str, state: Option<&str>) -> SourceRecord {
    SourceRecord {
      species: Some(species.into()),
      class: Some(class.into()),
      state: state.map(Into::into),
      ..SourceRecord::empty()
    }
  }

  fn table() -> SourceTable {
    SourceTable::new(vec![
      row("Harpia harpyja", "Aves", Some("MG")),
      row("Panthera onca", "Mammalia", Some("MG/RJ")),
      row("Harpia harpyja", "Aves", None),
    ])
  }

  #[test]
  fn values_replaced_by_keys() {
    let table = table();
    let maps = KeyMaps::extract(&table);
    let rows = rewrite(&table, &maps).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].species, Some(0));
    assert_eq!(rows[1].species, Some(1));
    assert_eq!(rows[2].species, Some(0));
    assert_eq!(rows[1].class, Some(1));
    assert_eq!(rows[1].state, Some(1));
    assert_eq!(rows[2].state, None);
    assert_eq!(rows[0].family, None);
  }

  #[test]
  fn reverse_mapping_restores_source() {
    let table = table();
    let maps = KeyMaps::extract(&table);
    let rows = rewrite(&table, &maps).unwrap();

    for (keyed, original) in rows.iter().zip(&table.records) {
      let restored = resolve(keyed, &maps).unwrap();
      for field in SourceField::ALL {
        assert_eq!(restored.get(field).copied(), original.text(field));
      }
    }
  }

  #[test]
  fn foreign_map_is_an_invariant_violation() {
    let table = table();
    let other = SourceTable::new(vec![row("Puma concolor", "Mammalia", None)]);
    let maps = KeyMaps::extract(&other);

    let err = rewrite(&table, &maps).unwrap_err();
    assert!(matches!(
      err,
      Error::UnmappedValue { field: SourceField::Class, ref value }
        if value == "Aves"
    ));
  }
}
