//! Training configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a model-selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Where the winning model is written
    pub model_path: PathBuf,

    /// YAML file with per-model hyperparameter grids; `None` skips the search
    pub params_path: Option<PathBuf>,

    /// Minimum test R² the best model must reach
    pub min_score: f64,

    /// Folds used by grid search
    pub cv_folds: usize,

    /// Seed threaded into every estimator
    pub random_state: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("artifacts").join("model.pkl"),
            params_path: Some(PathBuf::from("config").join("params.yaml")),
            min_score: 0.6,
            cv_folds: 3,
            random_state: Some(42),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_params_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.params_path = Some(path.into());
        self
    }

    /// Train every model with its defaults, without grid search
    pub fn without_params(mut self) -> Self {
        self.params_path = None;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }
}
