//! Exhaustive cross-validated grid search

use super::search_space::{grid_candidates, validate_grid, ParamGrid, ParamSet};
use crate::error::Result;
use crate::training::cross_validation::{take_rows, CrossValidator};
use crate::training::{r2_score, rank, Regressor};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean validation R² of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Outcome of a search. The winning estimator is not refitted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CandidateScore>,
}

/// Scores every grid candidate with K-fold CV on the data it is given.
///
/// Candidates are evaluated in parallel but collected in grid order, so the
/// result does not depend on scheduling. Ties go to the earlier candidate.
#[derive(Debug, Clone, Default)]
pub struct GridSearch {
    cv: CrossValidator,
}

impl GridSearch {
    pub fn new(cv: CrossValidator) -> Self {
        Self { cv }
    }

    pub fn with_folds(n_splits: usize) -> Self {
        Self::new(CrossValidator::new(n_splits))
    }

    pub fn fit<M>(&self, base: &M, grid: &ParamGrid, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult>
    where
        M: Regressor + Clone,
    {
        validate_grid(grid)?;
        let splits = self.cv.split(x.nrows())?;
        let folds: Vec<_> = splits
            .iter()
            .map(|s| (take_rows(x, y, &s.train_indices), take_rows(x, y, &s.test_indices)))
            .collect();

        let candidates = grid_candidates(grid);

        let cv_results: Vec<CandidateScore> = candidates
            .into_par_iter()
            .map(|params| {
                let mut configured = base.clone();
                configured.set_params(&params)?;

                let mut fold_scores = Vec::with_capacity(folds.len());
                for ((x_train, y_train), (x_val, y_val)) in &folds {
                    let mut model = configured.clone();
                    model.fit(x_train, y_train)?;
                    let y_pred = model.predict(x_val)?;
                    fold_scores.push(r2_score(y_val, &y_pred)?);
                }
                let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                debug!(params = ?params, mean_score, "grid candidate scored");

                Ok(CandidateScore {
                    params,
                    fold_scores,
                    mean_score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let best_idx = best_candidate(&cv_results);
        Ok(SearchResult {
            best_params: cv_results[best_idx].params.clone(),
            best_score: cv_results[best_idx].mean_score,
            cv_results,
        })
    }
}

/// Index of the highest mean score; the earliest wins ties and NaN never leads.
fn best_candidate(results: &[CandidateScore]) -> usize {
    let mut best_idx = 0;
    for (i, cand) in results.iter().enumerate().skip(1) {
        if rank(cand.mean_score) > rank(results[best_idx].mean_score) {
            best_idx = i;
        }
    }
    best_idx
}
