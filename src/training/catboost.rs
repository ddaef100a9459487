//! CatBoost-style gradient boosting on quantized features
//!
//! - Features are quantized into at most `border_count` bins once per fit
//! - Symmetric (oblivious) decision trees: all nodes at same depth use the same split
//! - Split search runs on per-leaf gradient histograms

use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    /// L2 regularization on leaf values
    pub l2_leaf_reg: f64,
    /// Maximum number of borders per feature
    pub border_count: usize,
    /// Bernoulli row sampling rate per tree
    pub subsample: f64,
    /// Fraction of features considered at each level
    pub rsm: f64,
    pub random_state: Option<u64>,
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            learning_rate: 0.05,
            depth: 6,
            l2_leaf_reg: 3.0,
            border_count: 254,
            subsample: 0.8,
            rsm: 1.0,
            random_state: None,
        }
    }
}

/// Per-feature split borders learned from the training matrix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Quantizer {
    borders: Vec<Vec<f64>>,
}

impl Quantizer {
    fn fit(x: &Array2<f64>, border_count: usize) -> Self {
        let borders = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut values: Vec<f64> = col.to_vec();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                let midpoints: Vec<f64> = values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
                if midpoints.len() <= border_count {
                    return midpoints;
                }
                // Evenly spaced quantiles of the distinct values
                let mut picked: Vec<f64> = (1..=border_count)
                    .map(|k| midpoints[k * midpoints.len() / (border_count + 1)])
                    .collect();
                picked.dedup();
                picked
            })
            .collect();
        Self { borders }
    }

    /// Column-major bin indices: `bins[feature][row]`
    fn transform(&self, x: &Array2<f64>) -> Vec<Vec<u16>> {
        self.borders
            .iter()
            .zip(x.columns())
            .map(|(borders, col)| {
                col.iter()
                    .map(|&v| borders.partition_point(|&b| b < v) as u16)
                    .collect()
            })
            .collect()
    }
}

/// Symmetric (oblivious) tree: each level uses the same split feature + threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        for &(feature, threshold) in &self.splits {
            idx = idx * 2 + usize::from(sample[feature] > threshold);
        }
        self.leaf_values[idx]
    }
}

#[derive(Debug, Clone, Copy)]
struct LevelSplit {
    feature: usize,
    border_idx: usize,
    gain: f64,
}

fn score(g: f64, c: f64, l2: f64) -> f64 {
    g * g / (c + l2)
}

/// Best border for one feature given the current leaf assignment
fn best_border(
    bins: &[u16],
    n_borders: usize,
    residuals: &[f64],
    rows: &[usize],
    leaf_of: &[usize],
    n_leaves: usize,
    l2: f64,
) -> Option<(usize, f64)> {
    if n_borders == 0 {
        return None;
    }
    let n_bins = n_borders + 1;
    let mut hist_g = vec![0.0; n_leaves * n_bins];
    let mut hist_c = vec![0.0; n_leaves * n_bins];
    for (pos, &row) in rows.iter().enumerate() {
        let cell = leaf_of[pos] * n_bins + bins[row] as usize;
        hist_g[cell] += residuals[row];
        hist_c[cell] += 1.0;
    }

    let totals: Vec<(f64, f64)> = (0..n_leaves)
        .map(|leaf| {
            let range = leaf * n_bins..(leaf + 1) * n_bins;
            (hist_g[range.clone()].iter().sum(), hist_c[range].iter().sum())
        })
        .collect();
    let parent: f64 = totals.iter().map(|&(g, c)| score(g, c, l2)).sum();

    let mut left_g = vec![0.0; n_leaves];
    let mut left_c = vec![0.0; n_leaves];
    let mut best: Option<(usize, f64)> = None;

    for border in 0..n_borders {
        let mut children = 0.0;
        for leaf in 0..n_leaves {
            let cell = leaf * n_bins + border;
            left_g[leaf] += hist_g[cell];
            left_c[leaf] += hist_c[cell];
            let (tg, tc) = totals[leaf];
            children += score(left_g[leaf], left_c[leaf], l2) + score(tg - left_g[leaf], tc - left_c[leaf], l2);
        }
        let gain = children - parent;
        if gain > 1e-12 && best.map_or(true, |(_, g)| gain > g) {
            best = Some((border, gain));
        }
    }
    best
}

fn build_symmetric_tree(
    bins: &[Vec<u16>],
    quantizer: &Quantizer,
    residuals: &[f64],
    rows: &[usize],
    config: &CatBoostConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> SymmetricTree {
    let n_features = bins.len();
    let n_try = ((n_features as f64 * config.rsm).ceil() as usize).clamp(1, n_features);
    let mut splits = Vec::with_capacity(config.depth);
    let mut leaf_of = vec![0usize; rows.len()];

    for level in 0..config.depth {
        let n_leaves = 1usize << level;
        let features: Vec<usize> = if n_try < n_features {
            let mut f = rand::seq::index::sample(rng, n_features, n_try).into_vec();
            f.sort_unstable();
            f
        } else {
            (0..n_features).collect()
        };

        let candidates: Vec<Option<LevelSplit>> = features
            .par_iter()
            .map(|&feature| {
                best_border(
                    &bins[feature],
                    quantizer.borders[feature].len(),
                    residuals,
                    rows,
                    &leaf_of,
                    n_leaves,
                    config.l2_leaf_reg,
                )
                .map(|(border_idx, gain)| LevelSplit { feature, border_idx, gain })
            })
            .collect();
        let best = candidates.into_iter().flatten().fold(None::<LevelSplit>, |best, cand| match best {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        });

        let Some(split) = best else { break };
        for (pos, &row) in rows.iter().enumerate() {
            let goes_right = bins[split.feature][row] as usize > split.border_idx;
            leaf_of[pos] = leaf_of[pos] * 2 + usize::from(goes_right);
        }
        splits.push((split.feature, quantizer.borders[split.feature][split.border_idx]));
    }

    let n_leaves = 1usize << splits.len();
    let mut sum_g = vec![0.0; n_leaves];
    let mut count = vec![0.0; n_leaves];
    for (pos, &row) in rows.iter().enumerate() {
        sum_g[leaf_of[pos]] += residuals[row];
        count[leaf_of[pos]] += 1.0;
    }
    let leaf_values = sum_g
        .iter()
        .zip(count.iter())
        .map(|(&g, &c)| g / (c + config.l2_leaf_reg))
        .collect();

    SymmetricTree { splits, leaf_values }
}

/// CatBoost-style regressor with RMSE loss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostRegressor {
    pub config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
}

impl Default for CatBoostRegressor {
    fn default() -> Self {
        Self::new(CatBoostConfig::default())
    }
}

impl CatBoostRegressor {
    pub fn new(config: CatBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.depth == 0 || c.depth > 16 {
            return Err(ScorelineError::invalid_param("depth", c.depth, "must be in 1..=16"));
        }
        if !(c.learning_rate > 0.0) {
            return Err(ScorelineError::invalid_param("learning_rate", c.learning_rate, "must be positive"));
        }
        if c.border_count == 0 || c.border_count > u16::MAX as usize - 1 {
            return Err(ScorelineError::invalid_param("border_count", c.border_count, "must be in 1..65535"));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(ScorelineError::invalid_param("subsample", c.subsample, "must be in (0, 1]"));
        }
        if !(c.rsm > 0.0 && c.rsm <= 1.0) {
            return Err(ScorelineError::invalid_param("rsm", c.rsm, "must be in (0, 1]"));
        }
        if c.l2_leaf_reg < 0.0 {
            return Err(ScorelineError::invalid_param("l2_leaf_reg", c.l2_leaf_reg, "must be non-negative"));
        }
        Ok(())
    }
}

impl Regressor for CatBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.validate()?;

        let n = x.nrows();
        self.n_features = x.ncols();
        self.trees.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let quantizer = Quantizer::fit(x, self.config.border_count);
        let bins = quantizer.transform(x);

        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);

        for _ in 0..self.config.iterations {
            let residuals: Vec<f64> = y.iter().zip(predictions.iter()).map(|(&yi, &p)| yi - p).collect();

            let mut rows: Vec<usize> = if self.config.subsample < 1.0 {
                (0..n).filter(|_| rng.gen_bool(self.config.subsample)).collect()
            } else {
                (0..n).collect()
            };
            if rows.is_empty() {
                rows = (0..n).collect();
            }

            let tree = build_symmetric_tree(&bins, &quantizer, &residuals, &rows, &self.config, &mut rng);

            for (i, row) in x.outer_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            return Err(ScorelineError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        Ok(x
            .outer_iter()
            .map(|row| {
                self.base_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            let c = &mut self.config;
            match name.as_str() {
                "iterations" | "n_estimators" => c.iterations = value.to_usize(name)?,
                "learning_rate" => c.learning_rate = value.to_f64(name)?,
                "depth" | "max_depth" => c.depth = value.to_usize(name)?,
                "l2_leaf_reg" => c.l2_leaf_reg = value.to_f64(name)?,
                "border_count" => c.border_count = value.to_usize(name)?,
                "subsample" => c.subsample = value.to_f64(name)?,
                "rsm" => c.rsm = value.to_f64(name)?,
                _ => return Err(unknown_param("CatBoostRegressor", name, value)),
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
