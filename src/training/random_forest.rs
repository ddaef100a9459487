//! Random Forest regressor

use super::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            criterion: Criterion::SquaredError,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, &val) in total.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.n_estimators == 0 {
            return Err(ScorelineError::invalid_param("n_estimators", 0, "must be positive"));
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();

        // One seed per tree drawn up front so the forest does not depend on thread scheduling
        let mut master = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| master.gen()).collect();

        let mut template = DecisionTree::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_criterion(self.criterion);
        template.max_depth = self.max_depth;

        let trees: Vec<DecisionTree> = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                let mut tree = template.clone();
                tree.fit_rows(x, y, &rows, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ScorelineError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut mean = Array1::<f64>::zeros(x.nrows());
        for preds in &all_predictions {
            mean += preds;
        }
        Ok(mean / self.trees.len() as f64)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = value.to_usize(name)?,
                "max_depth" => self.max_depth = value.to_optional_usize(name)?,
                "min_samples_split" => self.min_samples_split = value.to_usize(name)?,
                "min_samples_leaf" => self.min_samples_leaf = value.to_usize(name)?,
                "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
                "bootstrap" => self.bootstrap = value.to_bool(name)?,
                "criterion" => {
                    let s = value.to_str(name)?;
                    self.criterion = Criterion::parse(s).ok_or_else(|| {
                        ScorelineError::invalid_param(name, s, "unknown criterion")
                    })?;
                }
                _ => return Err(unknown_param("RandomForest", name, value)),
            }
        }
        Ok(())
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
