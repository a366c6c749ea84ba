//! pixcpe CLI - Command-line interface for cluster parameter estimation.
//!
//! Reads clusters and module descriptions from JSON, estimates hit positions
//! and errors with the generic estimator and writes them back as JSON.
#![allow(
    clippy::uninlined_format_args,
    clippy::too_many_lines
)]

mod events;

use clap::{Parser, Subcommand, ValueEnum};
use events::{estimate_events, EventFile};
use pixcpe_algorithms::GenericCpe;
use pixcpe_core::calibration::{TemplateStore, TemplateStrategy};
use pixcpe_core::config::CpeConfig;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] pixcpe_core::Error),

    #[error("cluster refers to unknown module {0}")]
    UnknownModule(u32),
}

/// Calibration template flavour.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Full templates
    Legacy,
    /// Light templates with calibrated charge width
    Light,
}

impl From<Strategy> for TemplateStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Legacy => TemplateStrategy::Legacy,
            Strategy::Light => TemplateStrategy::Light,
        }
    }
}

/// Pixel cluster position and error estimator.
#[derive(Parser)]
#[command(name = "pixcpe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate hit positions and errors for the clusters in an event file
    Estimate {
        /// Input event file (JSON)
        input: PathBuf,

        /// Estimator configuration (JSON); without it, errors come from the
        /// built-in tables unless --templates is given
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Calibration template file, overrides the configured path
        #[arg(short, long)]
        templates: Option<PathBuf>,

        /// Template flavour, overrides the configuration
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,

        /// Output file; hits are written to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a calibration template file
    Templates {
        /// Template file (JSON)
        input: PathBuf,

        /// Template flavour used for validation
        #[arg(short, long, value_enum, default_value = "legacy")]
        strategy: Strategy,
    },
}

/// Builds the estimator configuration from the command-line options.
///
/// Without a configuration file the tabulated errors are used, unless a
/// template file is given.
fn resolve_config(
    config: Option<&Path>,
    templates: Option<PathBuf>,
    strategy: Option<Strategy>,
) -> Result<CpeConfig> {
    let mut config = match config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None if templates.is_none() => CpeConfig::tabulated(),
        None => CpeConfig::default(),
    };
    if let Some(path) = templates {
        config.calibration_path = Some(path);
        config.load_calibration_from_database = false;
    }
    if let Some(strategy) = strategy {
        config.use_legacy_calibration = matches!(strategy, Strategy::Legacy);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            input,
            config,
            templates,
            strategy,
            output,
            verbose,
        } => {
            init_logging(verbose);

            let config = resolve_config(config.as_deref(), templates, strategy)?;
            let cpe = GenericCpe::from_config(config)?;
            let events = EventFile::open(&input)?;

            if verbose {
                eprintln!("Input: {}", input.display());
                eprintln!("Modules: {}", events.modules.len());
                eprintln!("Clusters: {}", events.clusters.len());
            }

            let start = Instant::now();
            let report = estimate_events(&cpe, &events)?;
            let elapsed = start.elapsed();

            match &output {
                Some(path) => {
                    let mut writer = BufWriter::new(File::create(path)?);
                    serde_json::to_writer_pretty(&mut writer, &report)?;
                    writer.flush()?;
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut writer = stdout.lock();
                    serde_json::to_writer_pretty(&mut writer, &report)?;
                    writeln!(writer)?;
                }
            }

            if verbose {
                eprintln!(
                    "Estimated {} hits in {:.3}s",
                    report.statistics.hits_total,
                    elapsed.as_secs_f64()
                );
                eprintln!(
                    "Edge fallbacks: {} ({:.3} per hit)",
                    report.statistics.edge_fallbacks,
                    report.statistics.edge_fallback_rate
                );
            }
        }

        Commands::Templates { input, strategy } => {
            init_logging(false);

            let store = TemplateStore::from_file(&input, strategy.into())?;
            let set = store.library().set();

            println!("File: {}", input.display());
            println!("Strategy: {:?}", store.strategy());
            println!("Templates: {}", set.templates.len());
            match set.default_template {
                Some(id) => println!("Default template: {}", id),
                None => println!("Default template: none"),
            }
            println!("Module assignments: {}", set.module_templates.len());
            for template in &set.templates {
                let width = template
                    .lorentz_width
                    .map_or_else(|| "-".to_string(), |[x, y]| format!("{:.1}/{:.1} um", x, y));
                println!(
                    "  #{:<6} entries={:<5} lorentz width={}",
                    template.id,
                    template.entries.len(),
                    width
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}
