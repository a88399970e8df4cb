//! Model training

pub mod split;
pub mod trainer;

pub use split::{stratified_split, SplitIndices};
pub use trainer::{FeatureImportance, HoldoutSet, Trainer, TrainingOutcome, TrainingReport};
