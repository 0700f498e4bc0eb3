use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};

use rvu_review::config::Config;
use rvu_review::logging;
use rvu_review::metrics::{init_metrics, render as render_metrics};
use rvu_review::pipeline::{derive_default_window, lookup, DirectExpenseCalculator};
use rvu_review::review::{briefing, ReviewReport, ReviewSession};
use rvu_review::sources::{SourceTables, SOURCE_CACHE};
use rvu_review::storage::{InMemoryStorage, Storage};
use rvu_review::types::{ProposedValues, SearchWindow, ValueSet};

#[derive(Parser)]
#[command(name = "rvu_review")]
#[command(about = "Physician work RVU review: direct expense, reference search and refinement statistics")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $RVU_REVIEW_CONFIG or ./rvu_review.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    emit_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a code's canonical attributes and default search window
    Lookup { code: String },
    /// Show direct practice expense line items and totals
    DirectPe { code: String },
    /// Show the comparison population and its bottom work quartile
    Search {
        code: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Run a full review and print the report
    Review {
        code: String,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        proposed: ProposedArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Show relative-value rows for a code
    Rvu { code: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Overrides for the default search window
#[derive(Args, Default)]
struct WindowArgs {
    #[arg(long)]
    tt_lower: Option<f64>,
    #[arg(long)]
    tt_upper: Option<f64>,
    #[arg(long)]
    ist_lower: Option<f64>,
    #[arg(long)]
    ist_upper: Option<f64>,
}

impl WindowArgs {
    fn is_empty(&self) -> bool {
        self.tt_lower.is_none()
            && self.tt_upper.is_none()
            && self.ist_lower.is_none()
            && self.ist_upper.is_none()
    }

    fn apply(&self, window: SearchWindow) -> SearchWindow {
        window
            .with_time(
                self.tt_lower.unwrap_or(window.time_lower),
                self.tt_upper.unwrap_or(window.time_upper),
            )
            .with_intraservice(
                self.ist_lower.unwrap_or(window.intraservice_lower),
                self.ist_upper.unwrap_or(window.intraservice_upper),
            )
    }
}

/// RUC and CMS values; unset RUC values fall back to current, unset CMS values to RUC
#[derive(Args, Default)]
struct ProposedArgs {
    #[arg(long)]
    ruc_tt: Option<f64>,
    #[arg(long)]
    ruc_ist: Option<f64>,
    #[arg(long)]
    ruc_work: Option<f64>,
    #[arg(long)]
    ruc_preservice: Option<f64>,
    #[arg(long)]
    ruc_postservice: Option<f64>,
    #[arg(long)]
    cms_tt: Option<f64>,
    #[arg(long)]
    cms_ist: Option<f64>,
    #[arg(long)]
    cms_work: Option<f64>,
    #[arg(long)]
    cms_preservice: Option<f64>,
    #[arg(long)]
    cms_postservice: Option<f64>,
}

impl ProposedArgs {
    fn apply(&self, defaults: ProposedValues) -> ProposedValues {
        let base = defaults.ruc;
        let ruc = ValueSet {
            tt: self.ruc_tt.unwrap_or(base.tt),
            ist: self.ruc_ist.unwrap_or(base.ist),
            work: self.ruc_work.unwrap_or(base.work),
            preservice: self.ruc_preservice.unwrap_or(base.preservice),
            postservice: self.ruc_postservice.unwrap_or(base.postservice),
        };
        let cms = ValueSet {
            tt: self.cms_tt.unwrap_or(ruc.tt),
            ist: self.cms_ist.unwrap_or(ruc.ist),
            work: self.cms_work.unwrap_or(ruc.work),
            preservice: self.cms_preservice.unwrap_or(ruc.preservice),
            postservice: self.cms_postservice.unwrap_or(ruc.postservice),
        };
        ProposedValues { ruc, cms }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn load_storage(config: &Config) -> Result<InMemoryStorage> {
    let tables = SourceTables::load(&config.sources, &SOURCE_CACHE)
        .with_context(|| format!("Failed to load source tables from {}", config.sources.data_dir.display()))?;
    Ok(InMemoryStorage::from_tables(tables))
}

fn start_session(
    storage: &InMemoryStorage,
    config: &Config,
    code: &str,
    window: &WindowArgs,
) -> Result<ReviewSession> {
    let session = ReviewSession::start(storage, config, code)?;
    if window.is_empty() {
        return Ok(session);
    }
    let adjusted = window.apply(session.window);
    Ok(session.with_window(storage, adjusted)?)
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    let storage = load_storage(config)?;

    match &cli.command {
        Commands::Lookup { code } => {
            let record = lookup(&storage, code)?;
            let window = derive_default_window(&record, &config.search);
            print_json(&json!({ "record": record, "default_window": window }))?;
        }
        Commands::DirectPe { code } => {
            let expense = DirectExpenseCalculator::new(&storage).compute(code)?;
            print_json(&expense)?;
        }
        Commands::Search { code, window } => {
            let session = start_session(&storage, config, code, window)?;
            print_json(&json!({
                "window": session.window,
                "work_percentile": session.split.work_percentile,
                "population_count": session.split.population.len(),
                "quartile_count": session.split.quartile.len(),
                "population": session.split.population,
                "quartile": session.split.quartile,
            }))?;
        }
        Commands::Review {
            code,
            window,
            proposed,
            format,
        } => {
            let session = start_session(&storage, config, code, window)?;
            let session = session.with_proposed(proposed.apply(session.proposed));
            let report = ReviewReport::from_session(&session, storage.provenance());
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => println!("{}", briefing::render(&report)),
            }
        }
        Commands::Rvu { code } => {
            let rows = storage.rvu_rows(code);
            if rows.is_empty() {
                anyhow::bail!("No relative-value rows for code '{}'", code);
            }
            print_json(&rows)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging);

    if cli.emit_metrics {
        init_metrics();
    }
    info!("🚀 rvu_review starting");

    let result = run(&cli, &config);
    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }

    if cli.emit_metrics {
        if let Some(text) = render_metrics() {
            eprintln!("{}", text);
        }
    }
    result
}
