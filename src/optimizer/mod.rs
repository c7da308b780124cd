//! Hyperparameter optimization
//!
//! Randomized search over a discrete random-forest grid, scored by
//! stratified k-fold cross-validated accuracy.

mod config;
mod grid;
mod search;

pub use config::SearchConfig;
pub use grid::{ForestParams, ParamGrid};
pub use search::{RandomizedSearch, SearchResult, TrialResult};
