//! Named, ordered set of candidate regressors

use super::adaboost::AdaBoostRegressor;
use super::catboost::CatBoostRegressor;
use super::decision_tree::DecisionTree;
use super::estimator::Estimator;
use super::gradient_boosting::GradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::LinearRegression;
use super::models::Regressor;
use super::random_forest::RandomForest;
use super::xgboost::XGBoostRegressor;
use crate::error::{Result, ScorelineError};

/// Ordered `(name, estimator)` pairs.
///
/// Insertion order decides evaluation order, error attribution and
/// tie-breaking during selection.
#[derive(Debug, Clone)]
pub struct ModelCatalogue<M = Estimator> {
    entries: Vec<(String, M)>,
}

impl<M> Default for ModelCatalogue<M> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<M: Regressor> ModelCatalogue<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Names must be unique.
    pub fn push(&mut self, name: impl Into<String>, estimator: M) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(ScorelineError::Configuration(format!(
                "duplicate model name '{}' in catalogue",
                name
            )));
        }
        self.entries.push((name, estimator));
        Ok(())
    }

    /// Builder form of [`push`](Self::push)
    pub fn with_model(mut self, name: impl Into<String>, estimator: M) -> Result<Self> {
        self.push(name, estimator)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&M> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &M)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut M)> {
        self.entries.iter_mut().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, M)> {
        self.entries
    }
}

impl ModelCatalogue<Estimator> {
    /// The eight reference regressor families with library defaults
    pub fn default_regressors() -> Self {
        let entries: Vec<(&str, Estimator)> = vec![
            ("Random Forest", RandomForest::default().into()),
            ("Decision Tree", DecisionTree::default().into()),
            ("Gradient Boosting", GradientBoostingRegressor::default().into()),
            ("Linear Regression", LinearRegression::default().into()),
            ("K-Neighbors Regressor", KNNRegressor::default().into()),
            ("XGBoost Regressor", XGBoostRegressor::default().into()),
            ("CatBoost Regressor", CatBoostRegressor::default().into()),
            ("AdaBoost Regressor", AdaBoostRegressor::default().into()),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(name, est)| (name.to_string(), est))
                .collect(),
        }
    }
}
