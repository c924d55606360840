//! SQL schema for the fauna store.
//!
//! [`REBUILD`] drops and recreates every table: it discards all stored data
//! and is not a migration. It also clears `PRAGMA user_version`; only a
//! completed population sets it to [`SCHEMA_VERSION`], so read-side commands
//! refuse a file whose load never finished.

use fauna_core::source::SourceField;

pub const SCHEMA_VERSION: i64 = 1;

/// Table holding the dimension rows of `field`.
pub fn dimension_table(field: SourceField) -> &'static str {
  match field {
    SourceField::Division => "division",
    SourceField::Class => "class",
    SourceField::Order => "taxon_order",
    SourceField::Family => "family",
    SourceField::Species => "species",
    SourceField::Category => "category",
    SourceField::ConservationUnit => "conservation_unit",
    SourceField::State => "state",
  }
}

/// Full destructive rebuild. Foreign keys are declared for readers of the
/// schema; they are not enforced (load order guarantees them).
pub const REBUILD: &str = "
PRAGMA user_version = 0;

DROP TABLE IF EXISTS risk;
DROP TABLE IF EXISTS species;
DROP TABLE IF EXISTS family;
DROP TABLE IF EXISTS taxon_order;
DROP TABLE IF EXISTS class;
DROP TABLE IF EXISTS division;
DROP TABLE IF EXISTS category;
DROP TABLE IF EXISTS conservation_unit;
DROP TABLE IF EXISTS conservation_unit_type;
DROP TABLE IF EXISTS state;

CREATE TABLE division (
    id    INTEGER NOT NULL PRIMARY KEY,
    name  TEXT UNIQUE
);

CREATE TABLE class (
    id    INTEGER NOT NULL PRIMARY KEY,
    name  TEXT UNIQUE
);

CREATE TABLE taxon_order (
    id        INTEGER NOT NULL PRIMARY KEY,
    name      TEXT UNIQUE,
    class_id  INTEGER REFERENCES class(id)
);

CREATE TABLE family (
    id        INTEGER NOT NULL PRIMARY KEY,
    name      TEXT UNIQUE,
    order_id  INTEGER REFERENCES taxon_order(id)
);

CREATE TABLE species (
    id           INTEGER NOT NULL PRIMARY KEY,
    name         TEXT UNIQUE,
    division_id  INTEGER REFERENCES division(id),
    class_id     INTEGER REFERENCES class(id),
    order_id     INTEGER REFERENCES taxon_order(id),
    family_id    INTEGER REFERENCES family(id)
);

-- description is filled by enrichment.
CREATE TABLE category (
    id           INTEGER NOT NULL PRIMARY KEY,
    name         TEXT UNIQUE,
    description  TEXT
);

-- full_name, development_index and literacy_rate are filled by enrichment.
-- name is the raw abbreviation text, composite values included ('MG/RJ').
CREATE TABLE state (
    id                 INTEGER NOT NULL PRIMARY KEY,
    name               TEXT UNIQUE,
    full_name          TEXT,
    development_index  REAL,
    literacy_rate      REAL
);

CREATE TABLE conservation_unit_type (
    id    INTEGER NOT NULL PRIMARY KEY,
    code  TEXT UNIQUE,
    name  TEXT
);

CREATE TABLE conservation_unit (
    id        INTEGER NOT NULL PRIMARY KEY,
    name      TEXT UNIQUE,
    state_id  INTEGER REFERENCES state(id),
    type_id   INTEGER REFERENCES conservation_unit_type(id)
);

-- One row per observed risk record. Append-only, deliberately keyless.
CREATE TABLE risk (
    species_id            INTEGER REFERENCES species(id),
    category_id           INTEGER REFERENCES category(id),
    conservation_unit_id  INTEGER REFERENCES conservation_unit(id)
);

CREATE INDEX risk_species_idx  ON risk(species_id);
CREATE INDEX risk_category_idx ON risk(category_id);
CREATE INDEX risk_unit_idx     ON risk(conservation_unit_id);
";
