//! Evaluation metrics for the fraud classifier.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Confusion matrix for binary classification, fraud as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True positives
    pub tp: usize,
    /// True negatives
    pub tn: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn new(true_pos: usize, false_pos: usize, false_neg: usize) -> Self {
        let precision = ratio(true_pos, true_pos + false_pos);
        let recall = ratio(true_pos, true_pos + false_neg);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: true_pos + false_neg,
        }
    }
}

/// Held-out evaluation of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub auc_roc: f64,
    pub accuracy: f64,
    pub legitimate: ClassMetrics,
    pub fraud: ClassMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    /// Evaluate hard labels and fraud probabilities against the truth
    pub fn evaluate(y_true: &[bool], y_pred: &[bool], y_proba: &[f64]) -> Self {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        Self {
            auc_roc: auc_roc(y_true, y_proba),
            accuracy: ratio(cm.tp + cm.tn, cm.total()),
            legitimate: ClassMetrics::new(cm.tn, cm.fn_, cm.fp),
            fraud: ClassMetrics::new(cm.tp, cm.fp, cm.fn_),
            confusion_matrix: cm,
        }
    }

    /// Print the report as a boxed summary
    pub fn print_summary(&self) {
        let cm = &self.confusion_matrix;

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              FRAUD MODEL - EVALUATION SUMMARY                ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ AUC-ROC: {:>6.4}            │  Accuracy: {:>6.4}              ║",
            self.auc_roc, self.accuracy
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Class        Precision   Recall   F1-score   Support         ║");
        for (name, m) in [("legitimate", &self.legitimate), ("fraud", &self.fraud)] {
            info!(
                "║ {:<12} {:>9.4} {:>8.4} {:>10.4} {:>9}         ║",
                name, m.precision, m.recall, m.f1, m.support
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confusion Matrix     predicted legit   predicted fraud       ║");
        info!("║   actual legit       {:>15}   {:>15}       ║", cm.tn, cm.fp);
        info!("║   actual fraud       {:>15}   {:>15}       ║", cm.fn_, cm.tp);
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores share their average rank. Returns 0.5 when either class is
/// absent.
pub fn auc_roc(y_true: &[bool], y_proba: &[f64]) -> f64 {
    let mut pairs: Vec<(f64, bool)> = y_proba.iter().copied().zip(y_true.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n_pos = pairs.iter().filter(|(_, t)| *t).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        // ranks are 1-based
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        let positives = pairs[i..=j].iter().filter(|(_, t)| *t).count();
        rank_sum_pos += avg_rank * positives as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}
