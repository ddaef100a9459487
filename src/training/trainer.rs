//! Arrays in, persisted best model out

use ndarray::Array2;
use tracing::info;

use super::catalogue::ModelCatalogue;
use super::config::TrainerConfig;
use super::estimator::Estimator;
use super::evaluator::{EvaluationReport, ModelEvaluator};
use super::models::r2_score;
use super::models::Regressor;
use super::selector::{ModelSelector, SelectedModel};
use crate::data::DatasetSplit;
use crate::error::Result;
use crate::optimizer::HyperparameterConfig;

/// Report plus the model that won
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: EvaluationReport,
    pub selected: SelectedModel<Estimator>,
}

/// Wires a split through the evaluator and selector.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train the default catalogue on arrays whose last column is the
    /// target and return the winner's test R².
    pub fn initiate_model_trainer(&self, train: Array2<f64>, test: Array2<f64>) -> Result<f64> {
        let split = DatasetSplit::from_arrays(train, test)?;
        let outcome = self.run(&split, ModelCatalogue::default_regressors())?;

        // Score the persisted winner again on the held-out rows
        let predicted = outcome.selected.estimator.predict(split.x_test())?;
        r2_score(split.y_test(), &predicted)
    }

    /// Evaluate `catalogue`, select and persist the best entry.
    pub fn run(&self, split: &DatasetSplit, mut catalogue: ModelCatalogue<Estimator>) -> Result<TrainingOutcome> {
        let grids = self.load_grids()?;

        let mut evaluator = ModelEvaluator::new().with_cv_folds(self.config.cv_folds);
        if let Some(seed) = self.config.random_state {
            evaluator = evaluator.with_random_state(seed);
        }
        let report = evaluator.evaluate(split, &mut catalogue, grids.as_ref())?;

        let selector = ModelSelector::new(&self.config.model_path).with_min_score(self.config.min_score);
        let selected = selector.select(&report, &catalogue)?;
        info!(model = %selected.name, r2 = selected.score, "Model selection complete");

        Ok(TrainingOutcome { report, selected })
    }

    fn load_grids(&self) -> Result<Option<HyperparameterConfig>> {
        match &self.config.params_path {
            Some(path) => {
                let grids = HyperparameterConfig::from_file(path)?;
                info!(path = %path.display(), models = grids.model_names().count(), "Loaded hyperparameter grids");
                Ok(Some(grids))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScorelineError;
    use crate::training::{DecisionTree, LinearRegression};
    use std::path::PathBuf;

    fn arrays(noise: bool) -> (Array2<f64>, Array2<f64>) {
        let make = |n: usize, offset: usize| {
            Array2::from_shape_fn((n, 3), |(i, j)| {
                let a = ((i + offset) * 7 % 13) as f64;
                let b = ((i + offset) * 5 % 11) as f64;
                match j {
                    0 => a,
                    1 => b,
                    _ if noise => ((i + offset) * 31 % 17) as f64,
                    _ => 1.5 * a - 2.0 * b + 4.0,
                }
            })
        };
        (make(40, 0), make(12, 40))
    }

    fn linear_only() -> ModelCatalogue<Estimator> {
        ModelCatalogue::new()
            .with_model("Linear Regression", LinearRegression::new().into())
            .unwrap()
    }

    #[test]
    fn test_run_persists_winner() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(TrainerConfig::new().with_model_path(dir.path().join("model.pkl")));
        let (train, test) = arrays(false);
        let split = DatasetSplit::from_arrays(train, test).unwrap();

        let outcome = trainer.run(&split, linear_only()).unwrap();
        assert_eq!(outcome.selected.name, "Linear Regression");
        assert!(outcome.selected.score > 0.999);
        assert!(outcome.selected.path.exists());
    }

    #[test]
    fn test_noise_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(TrainerConfig::new().with_model_path(dir.path().join("model.pkl")));
        let (train, test) = arrays(true);
        let split = DatasetSplit::from_arrays(train, test).unwrap();

        let err = trainer.run(&split, linear_only()).unwrap_err();
        assert!(matches!(err, ScorelineError::NoAcceptableModel { .. }));
        assert!(!dir.path().join("model.pkl").exists());
    }

    fn tree_and_linear() -> ModelCatalogue<Estimator> {
        ModelCatalogue::new()
            .with_model("Decision Tree", DecisionTree::new().into())
            .and_then(|c| c.with_model("Linear Regression", LinearRegression::new().into()))
            .unwrap()
    }

    #[test]
    fn test_default_config_searches_shipped_grids() {
        let config = TrainerConfig::default();
        assert_eq!(config.params_path, Some(PathBuf::from("config/params.yaml")));

        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(config.with_model_path(dir.path().join("model.pkl")));
        let (train, test) = arrays(false);
        let split = DatasetSplit::from_arrays(train, test).unwrap();

        let outcome = trainer.run(&split, tree_and_linear()).unwrap();
        let tree = outcome.report.get("Decision Tree").unwrap();
        assert!(tree.cv_score.is_some());
        assert!(tree.best_params.contains_key("criterion"));
        // An empty grid means defaults and no search
        assert!(outcome.report.get("Linear Regression").unwrap().cv_score.is_none());
    }

    #[test]
    fn test_without_params_skips_search() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(
            TrainerConfig::new()
                .without_params()
                .with_model_path(dir.path().join("model.pkl")),
        );
        let (train, test) = arrays(false);
        let split = DatasetSplit::from_arrays(train, test).unwrap();

        let outcome = trainer.run(&split, tree_and_linear()).unwrap();
        assert!(outcome.report.entries().iter().all(|s| s.cv_score.is_none()));
    }

    #[test]
    fn test_missing_params_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(
            TrainerConfig::new()
                .with_model_path(dir.path().join("model.pkl"))
                .with_params_path(dir.path().join("absent.yaml")),
        );
        let (train, test) = arrays(false);
        let split = DatasetSplit::from_arrays(train, test).unwrap();
        assert!(matches!(
            trainer.run(&split, linear_only()),
            Err(ScorelineError::Configuration(_))
        ));
    }
}
