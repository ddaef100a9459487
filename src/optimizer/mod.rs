//! Hyperparameter search
//!
//! - Parameter values, parameter sets and grids
//! - Grid configuration loaded from YAML
//! - Exhaustive K-fold grid search

mod config;
mod grid_search;
mod search_space;

pub use config::HyperparameterConfig;
pub use grid_search::{CandidateScore, GridSearch, SearchResult};
pub use search_space::{grid_candidates, unknown_param, validate_grid, ParamGrid, ParamSet, ParamValue};
