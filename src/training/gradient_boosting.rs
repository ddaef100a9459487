//! Gradient boosted regression trees with squared-error loss

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree; below 1.0 gives stochastic boosting
    pub subsample: f64,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            max_features: MaxFeatures::All,
            criterion: Criterion::FriedmanMse,
            random_state: None,
        }
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_prediction: f64,
    n_features: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if !(self.config.learning_rate > 0.0) {
            return Err(ScorelineError::invalid_param(
                "learning_rate",
                self.config.learning_rate,
                "must be positive",
            ));
        }
        if !(self.config.subsample > 0.0 && self.config.subsample <= 1.0) {
            return Err(ScorelineError::invalid_param(
                "subsample",
                self.config.subsample,
                "must be in (0, 1]",
            ));
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.trees.clear();

        // Initialize with mean
        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut template = DecisionTree::new()
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_criterion(self.config.criterion);
        template.max_depth = self.config.max_depth;

        for _ in 0..self.config.n_estimators {
            // Negative gradient of squared error
            let residuals = y - &predictions;
            let rows = self.subsample_indices(n_samples, &mut rng);

            let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            let mut tree = template.clone();
            tree.fit_rows(x, &residuals, &rows, &mut tree_rng)?;

            // Every row moves, sampled or not
            let update = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &update);

            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            return Err(ScorelineError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);
        }
        Ok(predictions)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.config.n_estimators = value.to_usize(name)?,
                "learning_rate" => self.config.learning_rate = value.to_f64(name)?,
                "max_depth" => self.config.max_depth = value.to_optional_usize(name)?,
                "min_samples_split" => self.config.min_samples_split = value.to_usize(name)?,
                "min_samples_leaf" => self.config.min_samples_leaf = value.to_usize(name)?,
                "subsample" => self.config.subsample = value.to_f64(name)?,
                "max_features" => self.config.max_features = MaxFeatures::from_param(name, value)?,
                "criterion" => {
                    let s = value.to_str(name)?;
                    self.config.criterion = Criterion::parse(s).ok_or_else(|| {
                        ScorelineError::invalid_param(name, s, "unknown criterion")
                    })?;
                }
                "loss" if value.to_str(name)? == "squared_error" => {}
                _ => return Err(unknown_param("GradientBoostingRegressor", name, value)),
            }
        }
        Ok(())
    }

    fn set_random_state(&mut self, seed: u64) {
        self.config.random_state = Some(seed);
    }

    fn is_fitted(&self) -> bool {
        self.n_features > 0
    }
}
