//! Pipeline settings: an optional TOML file overlaid by `FAUNA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use fauna_core::source::SourceSchema;
use fauna_ingest::reference::{ReferenceSource, StateTableColumns};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SPREADSHEET: &str = "fauna_fed.xlsx";
pub const DEFAULT_STORE: &str = "fauna_db.sqlite";
pub const DEFAULT_STATES_URL: &str =
  "https://pt.wikipedia.org/wiki/Unidades_federativas_do_Brasil";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub spreadsheet_path: PathBuf,
  /// Sheet to read; the first sheet when unset.
  pub sheet:            Option<String>,
  pub store_path:       PathBuf,
  pub columns:          SourceSchema,
  pub states:           StatesConfig,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      spreadsheet_path: DEFAULT_SPREADSHEET.into(),
      sheet:            None,
      store_path:       DEFAULT_STORE.into(),
      columns:          SourceSchema::default(),
      states:           StatesConfig::default(),
    }
  }
}

/// Where the state reference table comes from and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatesConfig {
  pub url:         String,
  /// Local copy of the page; used instead of fetching `url` when set.
  pub html_path:   Option<PathBuf>,
  /// Substring selecting the one table to read.
  pub table_match: String,
  pub columns:     StateTableColumns,
}

impl Default for StatesConfig {
  fn default() -> Self {
    Self {
      url:         DEFAULT_STATES_URL.into(),
      html_path:   None,
      table_match: "Abreviação".into(),
      columns:     StateTableColumns::default(),
    }
  }
}

impl StatesConfig {
  pub fn source(&self) -> ReferenceSource {
    match &self.html_path {
      Some(path) => ReferenceSource::File(expand_tilde(path)),
      None => ReferenceSource::Url(self.url.clone()),
    }
  }
}

impl PipelineConfig {
  /// Read `path` (if it exists), then `FAUNA_*` variables. Nested keys use
  /// `__`, e.g. `FAUNA_STATES__HTML_PATH`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("FAUNA")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise PipelineConfig")?;
    cfg.spreadsheet_path = expand_tilde(&cfg.spreadsheet_path);
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
