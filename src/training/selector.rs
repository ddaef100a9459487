//! Pick the best evaluated model and persist it

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::catalogue::ModelCatalogue;
use super::evaluator::{rank, EvaluationReport};
use super::models::Regressor;
use crate::error::{Result, ScorelineError};
use crate::export::{Artifact, ObjectStore};

/// The winning catalogue entry
#[derive(Debug, Clone)]
pub struct SelectedModel<M> {
    pub name: String,
    /// Test R²
    pub score: f64,
    pub estimator: M,
    /// Where the estimator was written
    pub path: PathBuf,
}

/// Chooses the highest test R² and enforces a quality floor.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    min_score: f64,
    model_path: PathBuf,
    store: ObjectStore,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(PathBuf::from("artifacts").join("model.pkl"))
    }
}

impl ModelSelector {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            min_score: 0.6,
            model_path: model_path.into(),
            store: ObjectStore::new(),
        }
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_store(mut self, store: ObjectStore) -> Self {
        self.store = store;
        self
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Name and score of the winner, without persisting anything.
    ///
    /// Walks `names` in order so the earliest entry wins ties. Scores equal to
    /// the threshold are accepted.
    pub fn choose<'a, I>(&self, report: &EvaluationReport, names: I) -> Result<(String, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(&str, f64)> = None;
        for name in names {
            let score = report.score(name).ok_or_else(|| {
                ScorelineError::Configuration(format!(
                    "model '{}' is in the catalogue but missing from the evaluation report",
                    name
                ))
            })?;
            if best.map_or(true, |(_, b)| rank(score) > rank(b)) {
                best = Some((name, score));
            }
        }

        let (name, score) = best.ok_or_else(|| {
            ScorelineError::Configuration("cannot select from an empty catalogue".to_string())
        })?;

        if !(score >= self.min_score) {
            warn!(
                best_model = name,
                best_score = score,
                threshold = self.min_score,
                "No model reached the acceptance threshold"
            );
            return Err(ScorelineError::NoAcceptableModel {
                best_model: name.to_string(),
                best_score: score,
                threshold: self.min_score,
            });
        }
        Ok((name.to_string(), score))
    }

    /// Choose the winner, persist its fitted estimator and return it.
    pub fn select<M>(&self, report: &EvaluationReport, catalogue: &ModelCatalogue<M>) -> Result<SelectedModel<M>>
    where
        M: Regressor + Artifact + Clone,
    {
        let (name, score) = self.choose(report, catalogue.names())?;
        let estimator = catalogue
            .get(&name)
            .ok_or_else(|| ScorelineError::Configuration(format!("model '{}' not in catalogue", name)))?
            .clone();
        if !estimator.is_fitted() {
            return Err(ScorelineError::evaluation(&name, ScorelineError::ModelNotFitted));
        }

        self.store.save(&self.model_path, &estimator)?;
        info!(model = %name, score, path = %self.model_path.display(), "Best model saved");

        Ok(SelectedModel {
            name,
            score,
            estimator,
            path: self.model_path.clone(),
        })
    }
}
