//! AdaBoost.R2 regression
//!
//! Each round fits a shallow regression tree on a weighted bootstrap sample,
//! then up-weights the rows it predicted worst. Prediction is the weighted
//! median of the ensemble.

use super::decision_tree::DecisionTree;
use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};
use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Per-sample loss used to reweight rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdaBoostLoss {
    #[default]
    Linear,
    Square,
    Exponential,
}

impl AdaBoostLoss {
    fn apply(&self, normalized_error: f64) -> f64 {
        match self {
            AdaBoostLoss::Linear => normalized_error,
            AdaBoostLoss::Square => normalized_error * normalized_error,
            AdaBoostLoss::Exponential => 1.0 - (-normalized_error).exp(),
        }
    }
}

/// AdaBoost Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub loss: AdaBoostLoss,
    /// Depth of each base tree
    pub base_max_depth: usize,
    pub random_state: Option<u64>,
    estimators: Vec<DecisionTree>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            loss: AdaBoostLoss::Linear,
            base_max_depth: 3,
            random_state: None,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_loss(mut self, loss: AdaBoostLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_estimators_fitted(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }
}

impl Regressor for AdaBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.n_estimators == 0 {
            return Err(ScorelineError::invalid_param("n_estimators", 0, "must be positive"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ScorelineError::invalid_param("learning_rate", self.learning_rate, "must be positive"));
        }

        let n = x.nrows();
        self.n_features = x.ncols();
        self.estimators.clear();
        self.estimator_weights.clear();

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut sample_weight = vec![1.0 / n as f64; n];
        let base = DecisionTree::new().with_max_depth(self.base_max_depth);

        for round in 0..self.n_estimators {
            let sampler = WeightedIndex::new(&sample_weight)
                .map_err(|e| ScorelineError::Computation(format!("invalid sample weights: {e}")))?;
            let rows: Vec<usize> = (0..n).map(|_| sampler.sample(&mut rng)).collect();

            let mut tree = base.clone();
            let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            tree.fit_rows(x, y, &rows, &mut tree_rng)?;
            let y_pred = tree.predict(x)?;

            let abs_err: Vec<f64> = y_pred.iter().zip(y.iter()).map(|(p, t)| (p - t).abs()).collect();
            let err_max = abs_err
                .iter()
                .zip(sample_weight.iter())
                .filter(|&(_, &w)| w > 0.0)
                .map(|(&e, _)| e)
                .fold(0.0, f64::max);

            let errors: Vec<f64> = abs_err
                .iter()
                .map(|&e| if err_max > 0.0 { self.loss.apply(e / err_max) } else { 0.0 })
                .collect();
            let estimator_error: f64 = errors.iter().zip(sample_weight.iter()).map(|(e, w)| e * w).sum();

            if estimator_error <= 0.0 {
                // Perfect fit on the weighted sample
                self.estimators.push(tree);
                self.estimator_weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                // No better than chance; keep it only if it is all we have
                if self.estimators.is_empty() {
                    self.estimators.push(tree);
                    self.estimator_weights.push(1.0);
                }
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            let estimator_weight = self.learning_rate * (1.0 / beta).ln();
            self.estimators.push(tree);
            self.estimator_weights.push(estimator_weight);

            if round + 1 < self.n_estimators {
                for (w, e) in sample_weight.iter_mut().zip(errors.iter()) {
                    if *w > 0.0 {
                        *w *= beta.powf((1.0 - e) * self.learning_rate);
                    }
                }
                let total: f64 = sample_weight.iter().sum();
                if total <= 0.0 {
                    break;
                }
                sample_weight.iter_mut().for_each(|w| *w /= total);
            }
        }

        Ok(())
    }

    /// Weighted median over the ensemble
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.estimators.is_empty() {
            return Err(ScorelineError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        let all: Vec<Array1<f64>> = self
            .estimators
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;
        let total_weight: f64 = self.estimator_weights.iter().sum();

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut pairs: Vec<(f64, f64)> = all
                    .iter()
                    .zip(self.estimator_weights.iter())
                    .map(|(preds, &w)| (preds[i], w))
                    .collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let half = 0.5 * total_weight;
                let mut cumulative = 0.0;
                for &(value, w) in &pairs {
                    cumulative += w;
                    if cumulative >= half {
                        return value;
                    }
                }
                pairs.last().map_or(0.0, |p| p.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = value.to_usize(name)?,
                "learning_rate" => self.learning_rate = value.to_f64(name)?,
                "loss" => {
                    self.loss = match value.to_str(name)? {
                        "linear" => AdaBoostLoss::Linear,
                        "square" => AdaBoostLoss::Square,
                        "exponential" => AdaBoostLoss::Exponential,
                        other => return Err(ScorelineError::invalid_param(name, other, "unknown loss")),
                    }
                }
                "max_depth" => self.base_max_depth = value.to_usize(name)?,
                _ => return Err(unknown_param("AdaBoostRegressor", name, value)),
            }
        }
        Ok(())
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }

    fn is_fitted(&self) -> bool {
        !self.estimators.is_empty()
    }
}
