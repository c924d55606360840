//! `fauna`: endangered-species risk pipeline.
//!
//! Loads the risk spreadsheet into a normalised SQLite store, enriches it
//! with reference data and prints grouped counts.
//!
//! # Usage
//!
//! ```text
//! fauna load --replace --spreadsheet fauna_fed.xlsx
//! fauna enrich
//! fauna report --by state
//! fauna run --replace --format json
//! ```
//!
//! Settings come from `fauna.toml` (or `--config`) and `FAUNA_*` environment
//! variables; see `fauna.example.toml`.

mod pipeline;
mod report;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use fauna_core::aggregate::GroupBy;
use fauna_store_sqlite::SqliteStore;
use settings::PipelineConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Endangered-species risk pipeline")]
struct Cli {
  /// Path to the TOML settings file.
  #[arg(short, long, default_value = "fauna.toml")]
  config: PathBuf,

  /// SQLite store path (overrides `store_path`).
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Read the spreadsheet into a freshly rebuilt store.
  Load(LoadArgs),
  /// Add state indicators, category descriptions and unit types.
  Enrich(EnrichArgs),
  /// Print grouped occurrence counts.
  Report(ReportArgs),
  /// Load, enrich and report in one go.
  Run {
    #[command(flatten)]
    load:   LoadArgs,
    #[command(flatten)]
    enrich: EnrichArgs,
    #[command(flatten)]
    report: ReportArgs,
  },
}

#[derive(Args)]
struct LoadArgs {
  /// Rebuild an existing store, discarding everything in it.
  #[arg(long)]
  replace: bool,

  /// Spreadsheet to read (overrides `spreadsheet_path`).
  #[arg(long)]
  spreadsheet: Option<PathBuf>,

  /// Sheet to read (overrides `sheet`).
  #[arg(long)]
  sheet: Option<String>,
}

#[derive(Args)]
struct EnrichArgs {
  /// Read the state reference page from a file instead of fetching it.
  #[arg(long)]
  states_html: Option<PathBuf>,

  /// Skip state enrichment (no network access).
  #[arg(long)]
  skip_states: bool,
}

#[derive(Args)]
struct ReportArgs {
  /// Report to print; all when omitted.
  #[arg(long, value_enum)]
  by: Option<ReportKind>,

  #[arg(long, value_enum, default_value_t = Format::Text)]
  format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportKind {
  State,
  Class,
  Division,
  UnitType,
  Indicators,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
  Text,
  Json,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = PipelineConfig::load(&cli.config)?;
  if let Some(store) = cli.store {
    cfg.store_path = settings::expand_tilde(&store);
  }

  match cli.command {
    Command::Load(args) => load(&mut cfg, args),
    Command::Enrich(args) => enrich(&mut cfg, args),
    Command::Report(args) => report(&cfg, args),
    Command::Run { load: l, enrich: e, report: r } => {
      load(&mut cfg, l)?;
      enrich(&mut cfg, e)?;
      report(&cfg, r)
    }
  }
}

fn load(cfg: &mut PipelineConfig, args: LoadArgs) -> anyhow::Result<()> {
  if let Some(path) = args.spreadsheet {
    cfg.spreadsheet_path = settings::expand_tilde(&path);
  }
  if args.sheet.is_some() {
    cfg.sheet = args.sheet;
  }

  let summary = pipeline::load(cfg, args.replace)?;
  for (field, rows) in &summary.dimensions {
    tracing::info!(%field, rows, "dimension loaded");
  }
  tracing::info!(
    facts = summary.facts,
    store = %cfg.store_path.display(),
    "load complete"
  );
  Ok(())
}

fn enrich(cfg: &mut PipelineConfig, args: EnrichArgs) -> anyhow::Result<()> {
  if let Some(path) = args.states_html {
    cfg.states.html_path = Some(path);
  }

  let mut store = pipeline::open_loaded(&cfg.store_path)?;
  let summary = pipeline::enrich(&mut store, &cfg.states, args.skip_states)?;
  if let Some(states) = summary.states {
    tracing::info!(
      inserted = states.inserted,
      updated = states.updated,
      "state indicators stored"
    );
  }
  tracing::info!(
    categories = summary.categories,
    units_linked = summary.unit_types.linked,
    units_total = summary.unit_types.total,
    "enrichment complete"
  );
  Ok(())
}

fn report(cfg: &PipelineConfig, args: ReportArgs) -> anyhow::Result<()> {
  let store = pipeline::open_loaded(&cfg.store_path)?;
  let kinds = match args.by {
    Some(kind) => vec![kind],
    None => vec![
      ReportKind::State,
      ReportKind::Class,
      ReportKind::Division,
      ReportKind::UnitType,
      ReportKind::Indicators,
    ],
  };

  let reports = kinds
    .into_iter()
    .map(|kind| build_report(&store, kind))
    .collect::<anyhow::Result<Vec<_>>>()?;

  match args.format {
    Format::Text => {
      let text: Vec<String> = reports.iter().map(report::Report::render_text).collect();
      println!("{}", text.join("\n"));
    }
    Format::Json => {
      let json = serde_json::to_string_pretty(&reports).context("failed to encode report")?;
      println!("{json}");
    }
  }
  Ok(())
}

fn build_report(store: &SqliteStore, kind: ReportKind) -> anyhow::Result<report::Report> {
  let report = match kind {
    ReportKind::State => report::by_group(store, GroupBy::State),
    ReportKind::Class => report::by_group(store, GroupBy::Class),
    ReportKind::Division => report::by_group(store, GroupBy::Division),
    ReportKind::UnitType => report::by_group(store, GroupBy::UnitType),
    ReportKind::Indicators => report::indicators(store),
  };
  report.context("failed to query store for report")
}
