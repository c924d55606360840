//! Surrogate key extraction.
//!
//! Each distinct value of a column gets a small integer key, assigned in the
//! order the value is first seen. Keys of one column form the contiguous
//! range `0..len`; columns never share a key space.

use std::collections::HashMap;

use tracing::debug;

use crate::source::{SourceField, SourceTable};

/// A surrogate key. Stored as SQLite `INTEGER`.
pub type Key = i64;

/// Bijection between the distinct values of one column and `0..len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
  keys:  HashMap<String, Key>,
  names: Vec<String>,
}

impl KeyMap {
  pub fn new() -> Self { Self::default() }

  /// Build a map from column values. Missing values are skipped; repeats
  /// keep the key of their first occurrence.
  pub fn extract<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
    let mut map = Self::new();
    for value in values.into_iter().flatten() {
      map.insert(value);
    }
    map
  }

  /// Key for `value`, assigning the next one if the value is new.
  pub fn insert(&mut self, value: &str) -> Key {
    if let Some(&key) = self.keys.get(value) {
      return key;
    }
    let key = self.names.len() as Key;
    self.keys.insert(value.to_owned(), key);
    self.names.push(value.to_owned());
    key
  }

  pub fn get(&self, value: &str) -> Option<Key> { self.keys.get(value).copied() }

  /// Reverse lookup.
  pub fn name_of(&self, key: Key) -> Option<&str> {
    usize::try_from(key)
      .ok()
      .and_then(|i| self.names.get(i))
      .map(String::as_str)
  }

  pub fn len(&self) -> usize { self.names.len() }

  pub fn is_empty(&self) -> bool { self.names.is_empty() }

  /// `(key, value)` pairs in key order.
  pub fn iter(&self) -> impl Iterator<Item = (Key, &str)> + '_ {
    self
      .names
      .iter()
      .enumerate()
      .map(|(i, name)| (i as Key, name.as_str()))
  }
}

/// One [`KeyMap`] per [`SourceField`].
#[derive(Debug, Clone, Default)]
pub struct KeyMaps {
  maps: [KeyMap; 8],
}

impl KeyMaps {
  /// Run the extractor over every field of `table` independently.
  pub fn extract(table: &SourceTable) -> Self {
    let mut maps = Self::default();
    for field in SourceField::ALL {
      let map = KeyMap::extract(table.column(field));
      debug!(%field, distinct = map.len(), "extracted surrogate keys");
      maps.maps[field.index()] = map;
    }
    maps
  }

  pub fn get(&self, field: SourceField) -> &KeyMap { &self.maps[field.index()] }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::SourceRecord;

  #[test]
  fn first_seen_order() {
    let map = KeyMap::extract([Some("Mammalia"), Some("Aves"), Some("Mammalia")]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("Mammalia"), Some(0));
    assert_eq!(map.get("Aves"), Some(1));
  }

  #[test]
  fn empty_column_gives_empty_map() {
    let map = KeyMap::extract(std::iter::empty());
    assert!(map.is_empty());
    let map = KeyMap::extract([None, None]);
    assert!(map.is_empty());
  }

  #[test]
  fn missing_values_get_no_key() {
    let map = KeyMap::extract([None, Some("CR"), None, Some("VU")]);
    assert_eq!(map.get("CR"), Some(0));
    assert_eq!(map.get("VU"), Some(1));
    assert_eq!(map.len(), 2);
  }

  #[test]
  fn keys_are_a_contiguous_bijection() {
    let values = ["b", "a", "c", "a", "b", "d", "c", "e"];
    let map = KeyMap::extract(values.iter().map(|v| Some(*v)));

    let keys: Vec<Key> = map.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (0..5).collect::<Vec<_>>());

    for (key, name) in map.iter() {
      assert_eq!(map.get(name), Some(key));
      assert_eq!(map.name_of(key), Some(name));
    }
    let ordered: Vec<&str> = map.iter().map(|(_, n)| n).collect();
    assert_eq!(ordered, ["b", "a", "c", "d", "e"]);
  }

  #[test]
  fn name_of_out_of_range() {
    let map = KeyMap::extract([Some("x")]);
    assert_eq!(map.name_of(1), None);
    assert_eq!(map.name_of(-1), None);
  }

  #[test]
  fn fields_have_independent_key_spaces() {
    let mut a = SourceRecord::empty();
    a.class = Some("Aves".into());
    a.state = Some("MG".into());
    let mut b = SourceRecord::empty();
    b.class = Some("Mammalia".into());
    b.state = Some("MG/RJ".into());
    let table = SourceTable::new(vec![a, b]);

    let maps = KeyMaps::extract(&table);
    assert_eq!(maps.get(SourceField::Class).get("Mammalia"), Some(1));
    assert_eq!(maps.get(SourceField::State).get("MG"), Some(0));
    assert_eq!(maps.get(SourceField::State).get("MG/RJ"), Some(1));
    assert!(maps.get(SourceField::Species).is_empty());
  }
}
