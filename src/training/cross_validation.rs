//! K-fold cross-validation splits

use crate::error::{Result, ScorelineError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter. Unshuffled by default so folds are contiguous blocks
/// in row order, with the remainder spread over the first folds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl CrossValidator {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle rows before splitting
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/validation splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(ScorelineError::Configuration(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(ScorelineError::Data(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();

        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Rows of `x` and `y` at `indices`
pub fn take_rows(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), indices), y.select(Axis(0), indices))
}
