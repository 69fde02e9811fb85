//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use parcelmosaic_core::{
    ProgressReporter, RunOptions, RunReport, UnitReport, UnitStatus, WriteStatus,
};
use parcelmosaic_engine::MemoryEngine;
use parcelmosaic_shared::{
    AppConfig, ConversionSettings, MapUnit, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ParcelMosaic — merge per-map CAD conversions into one county parcel layer.
#[derive(Parser)]
#[command(
    name = "parcelmosaic",
    version,
    about = "Merge per-map CAD parcel geometry into a county-wide parcel mosaic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every map unit under the root and build the mosaics.
    ///
    /// Runs against the built-in in-memory engine in structure-only mode;
    /// production pipelines embed parcelmosaic-core with a real engine.
    Run {
        /// Root directory of the Subdivision/MapUnit hierarchy.
        #[arg(long)]
        root: PathBuf,

        /// Layer request(s) to extract (overrides config; repeatable).
        #[arg(long = "layer")]
        layers: Vec<String>,

        /// Write the run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Enable the processed-units ledger for this run.
        #[arg(long)]
        ledger: bool,

        /// Preview the work list without touching any store: every unit is
        /// discovered and reported, nothing is imported or accumulated.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the map units discovery would process.
    Discover {
        /// Root directory of the Subdivision/MapUnit hierarchy.
        #[arg(long)]
        root: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "parcelmosaic=info",
        1 => "parcelmosaic=debug",
        _ => "parcelmosaic=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            root,
            layers,
            report,
            ledger,
            dry_run,
        } => cmd_run(root, layers, report.as_deref(), ledger, dry_run).await,
        Command::Discover { root } => cmd_discover(&root).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_run(
    root: PathBuf,
    layers: Vec<String>,
    report_path: Option<&std::path::Path>,
    ledger: bool,
    dry_run: bool,
) -> Result<()> {
    let config = load_config()?;

    if !root.is_dir() {
        return Err(eyre!("root '{}' is not a directory", root.display()));
    }

    let mut settings = ConversionSettings::from(&config);
    if !layers.is_empty() {
        settings.layers = layers;
    }

    let mut ledger_config = config.ledger.clone();
    if ledger {
        ledger_config.enabled = true;
    }

    let opts = RunOptions {
        root,
        settings,
        mosaic: config.mosaic.clone(),
        ledger: ledger_config,
    };

    info!(
        root = %opts.root.display(),
        layers = ?opts.settings.layers,
        ledger = opts.ledger.enabled,
        dry_run,
        "starting mosaic run"
    );

    // The conversion engine is pluggable; the built-in one is in-memory.
    // Permissive mode imports real CAD files as empty datasets
    // (structure-only run); a dry run uses the strict engine with nothing
    // seeded, so units are discovered and reported but no store is touched.
    let engine = if dry_run {
        MemoryEngine::new()
    } else {
        MemoryEngine::permissive()
    };
    let reporter = CliProgress::new();

    let report = parcelmosaic_core::run(&engine, &opts, &reporter).await?;

    print_summary(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        println!("  Report: {}", path.display());
        println!();
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  Mosaic run complete");
    println!("  Run ID:      {}", report.run_id);
    println!("  Units:       {}", report.units.len());
    println!("  Accumulated: {}", report.accumulated);
    println!("  Skipped:     {}", report.skipped);
    println!("  Failed:      {}", report.failed);
    println!("  Time:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();

    for unit in &report.units {
        match &unit.status {
            UnitStatus::Accumulated { polygons, lines } => {
                println!(
                    "    {:<30} accumulated (polygons: {}, lines: {})",
                    unit.unit,
                    write_label(polygons),
                    write_label(lines)
                );
            }
            UnitStatus::Skipped { reason } => {
                println!("    {:<30} skipped: {reason}", unit.unit);
            }
            UnitStatus::Failed { error } => {
                println!("    {:<30} FAILED: {error}", unit.unit);
            }
        }
    }
    println!();
}

fn write_label(status: &WriteStatus) -> &'static str {
    match status {
        WriteStatus::Initialized => "initialized",
        WriteStatus::Appended => "appended",
        WriteStatus::Failed { .. } => "failed",
    }
}

async fn cmd_discover(root: &std::path::Path) -> Result<()> {
    let units = parcelmosaic_discovery::discover_units(root)?;

    println!();
    println!("  {} map unit(s) under {}", units.len(), root.display());
    for unit in &units {
        println!("    {:<30} {}", unit.key(), unit.cad_source_path().display());
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn unit_started(&self, unit: &MapUnit, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {unit}"));
    }

    fn unit_finished(&self, report: &UnitReport) {
        self.spinner
            .set_message(format!("{} {}", report.unit, report.status.label()));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
