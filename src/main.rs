//! Fraud Detection Platform - Command Line Entry Point
//!
//! Generates synthetic transactions, trains the fraud model and scores
//! feature rows, one JSON object or a whole CSV at a time.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_detection_platform::{
    analytics::Overview,
    batch,
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    ingestion::RawTables,
    pipeline, FeatureRow, FraudError, Predictor,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fraud Detection Platform
#[derive(Parser)]
#[command(name = "fraud-detection-platform")]
#[command(about = "Synthetic payment data, random-forest fraud model and scoring")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic customers, merchants and transactions
    Generate,

    /// Train the fraud model on the raw tables
    Train,

    /// Score one feature row given as a JSON object
    Predict {
        /// JSON object mapping feature names to values
        #[arg(short, long, conflicts_with = "file")]
        json: Option<String>,

        /// File holding the JSON object (stdin when neither is given)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Score a CSV of feature rows
    PredictBatch {
        /// Input CSV with one feature row per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV with prediction columns appended
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate data, train the model and run quality checks
    Pipeline,

    /// Summarise the raw transaction table
    Overview {
        /// Print the overview as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run data quality checks on the raw tables
    Quality,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        if let Some(hint) = err.downcast_ref::<FraudError>().and_then(FraudError::hint) {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    init_tracing(&config.logging, cli.verbose)?;
    info!(
        raw_data_dir = %config.paths.raw_data_dir.display(),
        models_dir = %config.paths.models_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Generate => {
            let tables = pipeline::generate(&config).context("data generation failed")?;
            info!(
                transactions = tables.transactions.len(),
                fraud = tables.fraud_count(),
                "Data saved to {}",
                config.paths.raw_data_dir.display()
            );
        }
        Commands::Train => {
            pipeline::train(&config).context("training failed")?;
        }
        Commands::Predict { json, file } => {
            let raw = match (json, file) {
                (Some(json), _) => json,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read feature row from stdin")?;
                    buf
                }
            };
            let row: FeatureRow = serde_json::from_str(&raw)
                .map_err(FraudError::from)
                .context("feature row must be a JSON object of feature values")?;

            let predictor = Predictor::load_checked(&config.paths.models_dir, &config.feature_schema()?)?;
            let prediction = predictor.predict_one(&row)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Commands::PredictBatch { input, output } => {
            let predictor = Predictor::load_checked(&config.paths.models_dir, &config.feature_schema()?)?;
            let summary = batch::score_file(&predictor, &input, &output)?;
            info!(
                rows = summary.rows,
                flagged = summary.flagged,
                high = summary.high,
                medium = summary.medium,
                low = summary.low,
                "Predictions saved to {}",
                output.display()
            );
        }
        Commands::Pipeline => {
            let outcome = pipeline::run(&config).context("pipeline failed")?;
            info!(
                auc_roc = outcome.training.report.evaluation.auc_roc,
                quality_passed = outcome.quality.passed(),
                "Pipeline complete"
            );
        }
        Commands::Overview { json } => {
            let tables = load_tables(&config.paths.raw_data_dir)?;
            let overview = Overview::compute(&tables);
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                overview.print_summary();
            }
        }
        Commands::Quality => {
            let tables = load_tables(&config.paths.raw_data_dir)?;
            let report = pipeline::check_quality(&tables);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn load_tables(dir: &Path) -> Result<RawTables> {
    Ok(RawTables::load(dir)?)
}

/// RUST_LOG wins; otherwise the configured level, raised to debug by --verbose
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
