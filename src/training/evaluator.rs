//! Tune, fit and score every catalogue entry on one fixed split

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalogue::ModelCatalogue;
use super::models::{r2_score, Regressor};
use crate::data::DatasetSplit;
use crate::error::{Result, ScorelineError};
use crate::optimizer::{GridSearch, HyperparameterConfig, ParamGrid, ParamSet};

/// Scores for one catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub name: String,
    pub train_r2: f64,
    /// Held-out R², the value selection ranks on
    pub test_r2: f64,
    /// Parameters chosen by grid search; empty when no grid was configured
    pub best_params: ParamSet,
    /// Mean CV R² of the chosen parameters, when a search ran
    pub cv_score: Option<f64>,
    pub fit_seconds: f64,
}

impl ModelScore {
    /// A score with only the test R² filled in
    pub fn new(name: impl Into<String>, test_r2: f64) -> Self {
        Self {
            name: name.into(),
            train_r2: f64::NAN,
            test_r2,
            best_params: ParamSet::new(),
            cv_score: None,
            fit_seconds: 0.0,
        }
    }
}

/// Per-model results in catalogue order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    entries: Vec<ModelScore>,
}

impl EvaluationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, test R²)` pairs, keeping their order
    pub fn from_scores<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            entries: scores
                .into_iter()
                .map(|(name, score)| ModelScore::new(name, score))
                .collect(),
        }
    }

    pub fn push(&mut self, score: ModelScore) {
        self.entries.push(score);
    }

    pub fn entries(&self) -> &[ModelScore] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&ModelScore> {
        self.entries.iter().find(|s| s.name == name)
    }

    /// Test R² for `name`
    pub fn score(&self, name: &str) -> Option<f64> {
        self.get(name).map(|s| s.test_r2)
    }

    /// Model name to test R²
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|s| (s.name.clone(), s.test_r2))
            .collect()
    }

    /// Highest test R², earliest entry on ties
    pub fn best(&self) -> Option<&ModelScore> {
        let mut best: Option<&ModelScore> = None;
        for score in &self.entries {
            match best {
                Some(current) if !(rank(score.test_r2) > rank(current.test_r2)) => {}
                _ => best = Some(score),
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the model-selection loop over a catalogue.
///
/// Every entry sees the same split. The first failing entry aborts the run
/// and no partial report is returned.
#[derive(Debug, Clone)]
pub struct ModelEvaluator {
    cv_folds: usize,
    random_state: Option<u64>,
}

impl Default for ModelEvaluator {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            random_state: None,
        }
    }
}

impl ModelEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    pub fn random_state(&self) -> Option<u64> {
        self.random_state
    }

    /// Evaluate every entry in catalogue order.
    ///
    /// Entries are fitted in place, so after a successful run the catalogue
    /// holds the fitted estimators the report describes.
    pub fn evaluate<M>(
        &self,
        split: &DatasetSplit,
        catalogue: &mut ModelCatalogue<M>,
        grids: Option<&HyperparameterConfig>,
    ) -> Result<EvaluationReport>
    where
        M: Regressor + Clone,
    {
        info!(
            models = catalogue.len(),
            train_rows = split.n_train(),
            test_rows = split.n_test(),
            features = split.n_features(),
            "Evaluating model catalogue"
        );

        let mut report = EvaluationReport::new();
        for (name, estimator) in catalogue.iter_mut() {
            let grid = grids.and_then(|g| g.grid(name)).filter(|g| !g.is_empty());
            let score = self
                .evaluate_one(name, estimator, grid, split)
                .map_err(|e| attribute(name, e))?;

            info!(
                model = %score.name,
                train_r2 = score.train_r2,
                test_r2 = score.test_r2,
                seconds = score.fit_seconds,
                "Model evaluated"
            );
            report.push(score);
        }

        Ok(report)
    }

    fn evaluate_one<M>(
        &self,
        name: &str,
        estimator: &mut M,
        grid: Option<&ParamGrid>,
        split: &DatasetSplit,
    ) -> Result<ModelScore>
    where
        M: Regressor + Clone,
    {
        let start = Instant::now();
        if let Some(seed) = self.random_state {
            estimator.set_random_state(seed);
        }

        let (best_params, cv_score) = match grid {
            Some(grid) => {
                let result = GridSearch::with_folds(self.cv_folds).fit(
                    &*estimator,
                    grid,
                    split.x_train(),
                    split.y_train(),
                )?;
                debug!(
                    model = name,
                    candidates = result.cv_results.len(),
                    best_score = result.best_score,
                    "Grid search finished"
                );
                estimator.set_params(&result.best_params)?;
                (result.best_params, Some(result.best_score))
            }
            None => (ParamSet::new(), None),
        };

        estimator.fit(split.x_train(), split.y_train())?;
        let train_r2 = r2_score(split.y_train(), &estimator.predict(split.x_train())?)?;
        let test_r2 = r2_score(split.y_test(), &estimator.predict(split.x_test())?)?;

        Ok(ModelScore {
            name: name.to_string(),
            train_r2,
            test_r2,
            best_params,
            cv_score,
            fit_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

/// Ordering key for scores; NaN ranks below every real value
pub(crate) fn rank(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Grid and parameter problems are configuration errors; everything else is
/// an evaluation failure of that entry.
fn attribute(model: &str, err: ScorelineError) -> ScorelineError {
    match err {
        ScorelineError::Configuration(msg) => {
            ScorelineError::Configuration(format!("model '{}': {}", model, msg))
        }
        e @ ScorelineError::InvalidParameter { .. } => {
            ScorelineError::Configuration(format!("model '{}': {}", model, e))
        }
        other => ScorelineError::evaluation(model, other),
    }
}
