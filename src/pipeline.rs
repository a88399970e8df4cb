//! End-to-end steps: generate, train, quality checks

use crate::artifact::ModelArtifact;
use crate::config::AppConfig;
use crate::error::Result;
use crate::generator::TransactionGenerator;
use crate::ingestion::RawTables;
use crate::quality::{self, QualityReport};
use crate::training::{Trainer, TrainingOutcome};
use chrono::Local;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub training: TrainingOutcome,
    pub quality: QualityReport,
}

/// Generate the raw tables and write them to `paths.raw_data_dir`
pub fn generate(config: &AppConfig) -> Result<RawTables> {
    let tables = TransactionGenerator::new(&config.data_generation)?.generate_all()?;
    tables.save(&config.paths.raw_data_dir)?;
    Ok(tables)
}

/// Train on the tables in `paths.raw_data_dir` and persist the artifact
pub fn train(config: &AppConfig) -> Result<TrainingOutcome> {
    let tables = RawTables::load(&config.paths.raw_data_dir)?;
    train_on(&tables, config)
}

/// Train on in-memory tables and persist the artifact to `paths.models_dir`.
///
/// The previous artifact is only replaced once fitting and evaluation have
/// succeeded.
pub fn train_on(tables: &RawTables, config: &AppConfig) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let data = tables.feature_rows()?;
    info!(rows = data.len(), fraud = data.fraud_count(), "Feature rows built");

    let outcome = Trainer::new(&config.model)?.train(&data)?;
    outcome
        .artifact
        .save(&config.paths.models_dir, Some(&outcome.report))?;
    outcome.report.print_summary();

    info!(
        artifact_id = %outcome.artifact.id(),
        auc_roc = outcome.report.evaluation.auc_roc,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Training complete"
    );
    Ok(outcome)
}

/// Run the quality checks against the current wall clock
pub fn check_quality(tables: &RawTables) -> QualityReport {
    let report = quality::run_checks(tables, Local::now().naive_local());
    report.log();
    report
}

/// Generate, train, then check data quality. Quality failures are logged as
/// warnings and do not fail the run.
pub fn run(config: &AppConfig) -> Result<PipelineOutcome> {
    info!("Starting fraud detection pipeline");

    info!("Step 1/3: generating data");
    let tables = generate(config)?;

    info!("Step 2/3: training model");
    let training = train_on(&tables, config)?;

    info!("Step 3/3: data quality checks");
    let quality = check_quality(&tables);
    if !quality.passed() {
        warn!(
            failed = quality.failures().count(),
            "Data quality checks reported failures"
        );
    }

    info!(
        models_dir = %config.paths.models_dir.display(),
        artifact_present = ModelArtifact::exists(&config.paths.models_dir),
        "Pipeline finished"
    );
    Ok(PipelineOutcome { training, quality })
}
