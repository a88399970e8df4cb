//! Standard scaling of the numeric feature matrix

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};

/// Fitted statistics for one matrix column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    /// Population standard deviation; a constant column is stored as 1.0
    pub std: f64,
}

/// Per-column mean and standard deviation, fitted once on training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    columns: Vec<String>,
    stats: Vec<ColumnStats>,
}

impl ScalerState {
    /// Fit on a row-major training matrix
    pub fn fit(columns: &[String], matrix: &[Vec<f64>]) -> Result<Self> {
        if matrix.is_empty() {
            return Err(FraudError::Training(
                "cannot fit scaler on an empty feature matrix".to_string(),
            ));
        }
        if let Some((idx, row)) = matrix.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(FraudError::SchemaMismatch(format!(
                "row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }

        let n = matrix.len() as f64;
        let stats = (0..columns.len())
            .map(|j| {
                let mean = matrix.iter().map(|row| row[j]).sum::<f64>() / n;
                let variance = matrix.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                ColumnStats {
                    mean,
                    std: if std > f64::EPSILON { std } else { 1.0 },
                }
            })
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            stats,
        })
    }

    /// Scale one row with the fitted statistics
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.stats.len() {
            return Err(FraudError::SchemaMismatch(format!(
                "scaler fitted on {} columns, got {}",
                self.stats.len(),
                row.len()
            )));
        }

        Ok(row
            .iter()
            .zip(&self.stats)
            .map(|(x, s)| (x - s.mean) / s.std)
            .collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn stats(&self) -> &[ColumnStats] {
        &self.stats
    }
}
