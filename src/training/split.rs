//! Stratified train/test split

use crate::error::{FraudError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so both partitions keep the fraud ratio.
///
/// Each class sends `round(test_size * class_count)` rows to the test
/// partition, clamped so the class keeps at least one row on each side.
pub fn stratified_split(labels: &[bool], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if labels.is_empty() {
        return Err(FraudError::Training("cannot split an empty dataset".to_string()));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FraudError::Training(format!(
            "test_size must be within (0, 1), got {test_size}"
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (class, name) in [(false, "legitimate"), (true, "fraud")] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if members.len() < 2 {
            return Err(FraudError::Training(format!(
                "need at least 2 {name} rows to split, found {}",
                members.len()
            )));
        }

        let n_test = ((test_size * members.len() as f64).round() as usize).clamp(1, members.len() - 1);
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok(SplitIndices { train, test })
}
