//! Tree-ensemble classifier

pub mod forest;
pub mod tree;

pub use forest::{class_weights, ClassWeight, ForestConfig, RandomForest};
pub use tree::{DecisionTree, TreeConfig, TreeNode};
