//! CSV batch scoring: feature rows in, scored rows out

use crate::error::{FraudError, Result};
use crate::features::{FeatureRow, FeatureValue};
use crate::predictor::{Predictor, ScoredRow, PREDICTION_COLUMNS};
use crate::types::RiskTier;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Feature rows read from a CSV file, with the header order preserved
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub headers: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

/// Counts for a scored batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub flagged: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl BatchSummary {
    pub fn from_scored(scored: &[ScoredRow]) -> Self {
        let mut summary = Self {
            rows: scored.len(),
            ..Self::default()
        };
        for s in scored {
            if s.prediction.is_fraud_predicted {
                summary.flagged += 1;
            }
            match s.prediction.risk_level {
                RiskTier::High => summary.high += 1,
                RiskTier::Medium => summary.medium += 1,
                RiskTier::Low => summary.low += 1,
            }
        }
        summary
    }
}

/// Read a CSV of engineered features. Empty cells become missing values.
pub fn read_feature_table<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(FraudError::DataNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: FeatureRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.clone(), FeatureValue::parse(cell)))
            .collect();
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Feature table read");
    Ok(FeatureTable { headers, rows })
}

/// Write scored rows: the input columns in their original order followed
/// by the prediction columns.
pub fn write_scored_rows<P: AsRef<Path>>(path: P, headers: &[String], scored: &[ScoredRow]) -> Result<()> {
    let mut columns: Vec<String> = headers
        .iter()
        .filter(|h| !PREDICTION_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();
    columns.extend(PREDICTION_COLUMNS.iter().map(|c| c.to_string()));

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(&columns)?;
    for s in scored {
        let out = s.to_output_row();
        writer.write_record(
            columns
                .iter()
                .map(|c| out.get(c).map(|v| v.to_string()).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Score every row of `input` and write the result to `output`
pub fn score_file<P: AsRef<Path>, Q: AsRef<Path>>(
    predictor: &Predictor,
    input: P,
    output: Q,
) -> Result<BatchSummary> {
    let table = read_feature_table(&input)?;
    let scored = predictor.predict_batch(&table.rows)?;
    write_scored_rows(&output, &table.headers, &scored)?;

    let summary = BatchSummary::from_scored(&scored);
    info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        rows = summary.rows,
        flagged = summary.flagged,
        high = summary.high,
        "Batch predictions written"
    );
    Ok(summary)
}
