//! K-Nearest Neighbors regression

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

impl DistanceMetric {
    fn from_p(p: f64) -> Result<Self> {
        if p < 1.0 {
            return Err(ScorelineError::invalid_param("p", p, "must be >= 1"));
        }
        Ok(if p == 1.0 {
            DistanceMetric::Manhattan
        } else if p == 2.0 {
            DistanceMetric::Euclidean
        } else {
            DistanceMetric::Minkowski(p)
        })
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KNNRegressor {
    pub config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }
}

impl Regressor for KNNRegressor {
    /// Stores the training data; neighbours are searched at prediction time.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(ScorelineError::invalid_param("n_neighbors", 0, "must be positive"));
        }
        if self.config.n_neighbors > x.nrows() {
            return Err(ScorelineError::invalid_param(
                "n_neighbors",
                self.config.n_neighbors,
                format!("cannot exceed the {} training samples", x.nrows()),
            ));
        }
        self.x_train = Some(x.as_standard_layout().into_owned());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict (parallelized over query rows)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(ScorelineError::ModelNotFitted),
        };
        check_features(x_train.ncols(), x)?;

        let k = self.config.n_neighbors;
        let metric = self.config.metric;
        let weights = self.config.weights;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let point = x.row(i).to_vec();
                let neighbors = find_k_nearest(&point, x_train, y_train, k, metric);
                weighted_mean_from(&neighbors, weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_neighbors" => self.config.n_neighbors = value.to_usize(name)?,
                "weights" => {
                    self.config.weights = match value.to_str(name)? {
                        "uniform" => WeightScheme::Uniform,
                        "distance" => WeightScheme::Distance,
                        other => {
                            return Err(ScorelineError::invalid_param(name, other, "unknown weighting"))
                        }
                    }
                }
                "p" => self.config.metric = DistanceMetric::from_p(value.to_f64(name)?)?,
                "metric" => {
                    self.config.metric = match value.to_str(name)? {
                        "euclidean" => DistanceMetric::Euclidean,
                        "manhattan" => DistanceMetric::Manhattan,
                        "minkowski" => self.config.metric,
                        other => {
                            return Err(ScorelineError::invalid_param(name, other, "unknown metric"))
                        }
                    }
                }
                _ => return Err(unknown_param("KNNRegressor", name, value)),
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }
}

/// Max-heap entry for partial sort (keeps k smallest distances)
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Find k nearest neighbors using a max-heap. Equidistant points keep the
/// earlier training row.
fn find_k_nearest(
    point: &[f64],
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (row, &label) in x_train.outer_iter().zip(y_train.iter()) {
        let dist = compute_distance(point, row.iter(), metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, label));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, label));
            }
        }
    }

    heap.into_sorted_vec().into_iter().map(|dl| (dl.0, dl.1)).collect()
}

fn compute_distance<'a>(a: &[f64], b: impl Iterator<Item = &'a f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b).map(|(ai, bi)| (ai - bi).abs()).sum(),
        DistanceMetric::Minkowski(p) => a
            .iter()
            .zip(b)
            .map(|(ai, bi)| (ai - bi).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p),
    }
}

/// Weighted mean of neighbour targets. Under distance weighting, exact
/// matches take all the weight.
fn weighted_mean_from(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    match weights {
        WeightScheme::Uniform => mean_of(neighbors.iter().map(|&(_, y)| y)),
        WeightScheme::Distance => {
            if neighbors.iter().any(|&(d, _)| d == 0.0) {
                return mean_of(neighbors.iter().filter(|(d, _)| *d == 0.0).map(|&(_, y)| y));
            }
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for &(dist, y) in neighbors {
                let w = 1.0 / dist;
                weighted_sum += w * y;
                weight_total += w;
            }
            weighted_sum / weight_total
        }
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), y| (s + y, c + 1));
    sum / count.max(1) as f64
}
