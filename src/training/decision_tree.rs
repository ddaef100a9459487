//! CART regression tree

use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet, ParamValue};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if row[*feature_idx] <= *threshold { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }
}

/// Split quality criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Variance reduction, mean leaf values
    SquaredError,
    /// Friedman's improvement score, mean leaf values
    FriedmanMse,
    /// Absolute deviation from the median, median leaf values
    AbsoluteError,
    /// Half Poisson deviance; requires a non-negative target
    Poisson,
}

impl Criterion {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "squared_error" | "mse" => Some(Criterion::SquaredError),
            "friedman_mse" => Some(Criterion::FriedmanMse),
            "absolute_error" | "mae" => Some(Criterion::AbsoluteError),
            "poisson" => Some(Criterion::Poisson),
            _ => None,
        }
    }
}

/// How many features to consider at each split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => *n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }

    pub fn from_param(name: &str, value: &ParamValue) -> Result<Self> {
        match value {
            ParamValue::Null => Ok(MaxFeatures::All),
            ParamValue::Str(s) if s == "sqrt" => Ok(MaxFeatures::Sqrt),
            ParamValue::Str(s) if s == "log2" => Ok(MaxFeatures::Log2),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            ParamValue::Int(n) if *n > 0 => Ok(MaxFeatures::Fixed(*n as usize)),
            other => Err(ScorelineError::invalid_param(
                name,
                other,
                "expected sqrt, log2, a fraction in (0, 1], a positive integer or null",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree grown greedily on sorted prefix statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    /// Seed for feature subsampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::SquaredError,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
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

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit on the subset of rows named by `rows` (duplicates allowed).
    pub(crate) fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        check_xy(x, y)?;
        if rows.is_empty() {
            return Err(ScorelineError::Data("cannot fit a tree on zero rows".to_string()));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(ScorelineError::invalid_param(
                "min_samples_split",
                self.min_samples_split,
                "min_samples_split must be >= 2 and min_samples_leaf >= 1",
            ));
        }
        if self.criterion == Criterion::Poisson {
            if rows.iter().any(|&i| y[i] < 0.0) {
                return Err(ScorelineError::Data(
                    "poisson criterion requires a non-negative target".to_string(),
                ));
            }
            if rows.iter().map(|&i| y[i]).sum::<f64>() <= 0.0 {
                return Err(ScorelineError::Data(
                    "poisson criterion requires a target with positive sum".to_string(),
                ));
            }
        }

        self.n_features = x.ncols();
        let n_try = self.max_features.resolve(self.n_features);
        let mut importances = vec![0.0; self.n_features];

        let root = self.build_node(x, y, rows.to_vec(), 0, n_try, rng, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: Vec<usize>,
        depth: usize,
        n_try: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = rows.len();
        let value = self.leaf_value(y, &rows);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_constant(y, &rows);
        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let features = self.candidate_features(n_try, rng);
        let Some(split) = self.find_best_split(x, y, &rows, &features) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);
        importances[split.feature_idx] += split.gain;

        let left = Box::new(self.build_node(x, y, left_rows, depth + 1, n_try, rng, importances));
        let right = Box::new(self.build_node(x, y, right_rows, depth + 1, n_try, rng, importances));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
        }
    }

    fn candidate_features(&self, n_try: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        if n_try >= self.n_features {
            return (0..self.n_features).collect();
        }
        let mut features = rand::seq::index::sample(rng, self.n_features, n_try).into_vec();
        features.sort_unstable();
        features
    }

    /// Best split across `features`; ties keep the lower feature index and
    /// the lower threshold.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| self.best_split_for_feature(x, y, rows, feature_idx))
            .collect();

        per_feature.into_iter().flatten().fold(None, |best, cand| match best {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        feature_idx: usize,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
        let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
        let total_xlogx: f64 = pairs.iter().map(|p| xlogx(p.1)).sum();

        let parent = match self.criterion {
            Criterion::SquaredError | Criterion::FriedmanMse => sse(n, total_sum, total_sq),
            Criterion::Poisson => poisson_deviance(n, total_sum, total_xlogx),
            Criterion::AbsoluteError => {
                let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
                abs_deviation(&ys)
            }
        };

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut left_xlogx = 0.0;

        for i in 1..n {
            let yi = pairs[i - 1].1;
            left_sum += yi;
            left_sq += yi * yi;
            left_xlogx += xlogx(yi);

            let n_left = i;
            let n_right = n - i;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }
            if pairs[i - 1].0 == pairs[i].0 {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let gain = match self.criterion {
                Criterion::SquaredError => {
                    parent - sse(n_left, left_sum, left_sq) - sse(n_right, right_sum, total_sq - left_sq)
                }
                Criterion::FriedmanMse => {
                    let diff = left_sum / n_left as f64 - right_sum / n_right as f64;
                    (n_left * n_right) as f64 / n as f64 * diff * diff
                }
                Criterion::Poisson => {
                    if left_sum <= 0.0 || right_sum <= 0.0 {
                        continue;
                    }
                    parent
                        - poisson_deviance(n_left, left_sum, left_xlogx)
                        - poisson_deviance(n_right, right_sum, total_xlogx - left_xlogx)
                }
                Criterion::AbsoluteError => {
                    let left: Vec<f64> = pairs[..i].iter().map(|p| p.1).collect();
                    let right: Vec<f64> = pairs[i..].iter().map(|p| p.1).collect();
                    parent - abs_deviation(&left) - abs_deviation(&right)
                }
            };

            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: (pairs[i - 1].0 + pairs[i].0) / 2.0,
                    gain,
                });
            }
        }

        best
    }

    fn leaf_value(&self, y: &Array1<f64>, rows: &[usize]) -> f64 {
        let values: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
        match self.criterion {
            Criterion::AbsoluteError => median(&values),
            _ => values.iter().sum::<f64>() / values.len().max(1) as f64,
        }
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Depth of the fitted tree (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &rows, &mut rng)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ScorelineError::ModelNotFitted)?;
        check_features(self.n_features, x)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(slice) => root.predict_row(slice),
                None => root.predict_row(&row.to_vec()),
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "criterion" => {
                    let s = value.to_str(name)?;
                    self.criterion = Criterion::parse(s).ok_or_else(|| {
                        ScorelineError::invalid_param(name, s, "unknown criterion")
                    })?;
                }
                "max_depth" => self.max_depth = value.to_optional_usize(name)?,
                "min_samples_split" => self.min_samples_split = value.to_usize(name)?,
                "min_samples_leaf" => self.min_samples_leaf = value.to_usize(name)?,
                "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
                "splitter" if value.to_str(name)? == "best" => {}
                _ => return Err(unknown_param("DecisionTree", name, value)),
            }
        }
        Ok(())
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

fn is_constant(y: &Array1<f64>, rows: &[usize]) -> bool {
    let first = y[rows[0]];
    rows.iter().all(|&i| (y[i] - first).abs() < 1e-12)
}

fn sse(n: usize, sum: f64, sq: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sq - sum * sum / n as f64).max(0.0)
}

fn xlogx(v: f64) -> f64 {
    if v > 0.0 {
        v * v.ln()
    } else {
        0.0
    }
}

fn poisson_deviance(n: usize, sum: f64, sum_xlogx: f64) -> f64 {
    if n == 0 || sum <= 0.0 {
        return 0.0;
    }
    sum_xlogx - sum * (sum / n as f64).ln()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn abs_deviation(values: &[f64]) -> f64 {
    let m = median(values);
    values.iter().map(|v| (v - m).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        // Fully grown tree memorises distinct points
        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_max_depth() {
        let x = Array2::from_shape_fn((16, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(16, |i| (i as f64).sin());

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
        assert!(tree.get_n_leaves() <= 4);
    }

    #[test]
    fn test_step_function_split() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];

        for criterion in [
            Criterion::SquaredError,
            Criterion::FriedmanMse,
            Criterion::AbsoluteError,
            Criterion::Poisson,
        ] {
            let mut tree = DecisionTree::new().with_criterion(criterion).with_max_depth(1);
            tree.fit(&x, &y).unwrap();
            let pred = tree.predict(&array![[2.5], [10.5]]).unwrap();
            assert_eq!(pred[0], 1.0, "{criterion:?}");
            assert_eq!(pred[1], 5.0, "{criterion:?}");
        }
    }

    #[test]
    fn test_poisson_rejects_negative_target() {
        let x = array![[1.0], [2.0]];
        let y = array![-1.0, 2.0];
        let mut tree = DecisionTree::new().with_criterion(Criterion::Poisson);
        assert!(tree.fit(&x, &y).is_err());
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_seeded_feature_subsampling_reproducible() {
        let x = Array2::from_shape_fn((40, 6), |(i, j)| ((i * 7 + j * 13) % 17) as f64);
        let y = Array1::from_shape_fn(40, |i| (i % 5) as f64);

        let mut a = DecisionTree::new().with_max_features(MaxFeatures::Fixed(2)).with_random_state(3);
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_set_params() {
        let mut tree = DecisionTree::new();
        let mut params = ParamSet::new();
        params.insert("criterion".to_string(), ParamValue::from("friedman_mse"));
        params.insert("max_depth".to_string(), ParamValue::Int(4));
        params.insert("max_features".to_string(), ParamValue::from("sqrt"));
        tree.set_params(&params).unwrap();
        assert_eq!(tree.criterion, Criterion::FriedmanMse);
        assert_eq!(tree.max_depth, Some(4));
        assert_eq!(tree.max_features, MaxFeatures::Sqrt);

        let mut bad = ParamSet::new();
        bad.insert("criterion".to_string(), ParamValue::from("gini"));
        assert!(tree.set_params(&bad).is_err());
    }

    #[test]
    fn test_predict_wrong_width() {
        let mut tree = DecisionTree::new();
        tree.fit(&array![[1.0, 2.0], [3.0, 4.0]], &array![1.0, 2.0]).unwrap();
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}
