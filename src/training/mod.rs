//! Model training module
//!
//! Provides the ensemble classifier and its evaluation tooling:
//! - Binary CART decision trees (Gini / entropy)
//! - Random Forest with bootstrap sampling and per-split feature subsampling
//! - Stratified k-fold cross-validation

pub mod cross_validation;
pub mod decision_tree;
pub mod random_forest;

pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{accuracy, MaxFeatures, RandomForest};
