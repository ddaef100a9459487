//! Hyperparameter grid configuration loaded from YAML

use super::search_space::{validate_grid, ParamGrid, ParamValue};
use crate::error::{Result, ScorelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Older params files keyed these families by classifier-style names.
const LEGACY_NAMES: &[(&str, &str)] = &[
    ("K-Neighbors Regressor", "K-Neighbors Classifier"),
    ("XGBoost Regressor", "XGBClassifier"),
    ("CatBoost Regressor", "CatBoosting Classifier"),
    ("AdaBoost Regressor", "AdaBoost Classifier"),
];

/// Grids keyed by catalogue model name.
///
/// The file format is a top-level mapping from model name to a mapping of
/// parameter name to a list of candidate values:
///
/// ```yaml
/// Decision Tree:
///   criterion: [squared_error, friedman_mse]
///   max_depth: [3, 5, null]
/// ```
///
/// A model missing from the mapping is trained with its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterConfig {
    grids: BTreeMap<String, ParamGrid>,
}

impl HyperparameterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document parses as null rather than an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing or unreadable file is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScorelineError::Configuration(format!(
                "cannot read hyperparameter file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Builder-style insertion of a grid for one model.
    pub fn with_grid(mut self, model: impl Into<String>, grid: ParamGrid) -> Self {
        self.grids.insert(model.into(), grid);
        self
    }

    /// Builder-style insertion of one parameter's candidates.
    pub fn with_param(
        mut self,
        model: impl Into<String>,
        param: impl Into<String>,
        values: Vec<ParamValue>,
    ) -> Self {
        self.grids
            .entry(model.into())
            .or_default()
            .insert(param.into(), values);
        self
    }

    /// Grid for `model`, falling back to its legacy key when the file uses one.
    pub fn grid(&self, model: &str) -> Option<&ParamGrid> {
        self.grids.get(model).or_else(|| {
            LEGACY_NAMES
                .iter()
                .find(|(name, _)| *name == model)
                .and_then(|(_, legacy)| self.grids.get(*legacy))
        })
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.grids.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (model, grid) in &self.grids {
            validate_grid(grid).map_err(|e| {
                ScorelineError::Configuration(format!("grid for '{model}': {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"
Decision Tree:
  criterion: [squared_error, friedman_mse]
  max_depth: [3, null]
Gradient Boosting:
  learning_rate: [0.1, 0.05]
Linear Regression: {}
"#;

    #[test]
    fn test_parse_yaml() {
        let config = HyperparameterConfig::from_yaml_str(PARAMS).unwrap();
        let tree = config.grid("Decision Tree").unwrap();
        assert_eq!(tree["criterion"].len(), 2);
        assert_eq!(tree["max_depth"][1], ParamValue::Null);
        assert!(config.grid("Linear Regression").unwrap().is_empty());
        assert!(config.grid("Random Forest").is_none());
    }

    #[test]
    fn test_legacy_keys_resolve() {
        let yaml = r#"
XGBClassifier:
  learning_rate: [0.1, 0.01]
K-Neighbors Classifier:
  n_neighbors: [5, 7]
AdaBoost Classifier:
  n_estimators: [8]
AdaBoost Regressor:
  n_estimators: [16, 32]
"#;
        let config = HyperparameterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.grid("XGBoost Regressor").unwrap()["learning_rate"].len(), 2);
        assert_eq!(config.grid("K-Neighbors Regressor").unwrap()["n_neighbors"].len(), 2);
        assert!(config.grid("CatBoost Regressor").is_none());
        // The current name wins over the legacy one
        assert_eq!(config.grid("AdaBoost Regressor").unwrap()["n_estimators"].len(), 2);
    }

    #[test]
    fn test_empty_document() {
        let config = HyperparameterConfig::from_yaml_str("  \n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_rejects_empty_value_list() {
        let err = HyperparameterConfig::from_yaml_str("Decision Tree:\n  max_depth: []\n").unwrap_err();
        assert!(err.to_string().contains("Decision Tree"));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = HyperparameterConfig::from_yaml_str("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, ScorelineError::Configuration(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = HyperparameterConfig::from_file("/nonexistent/params.yaml").unwrap_err();
        assert!(matches!(err, ScorelineError::Configuration(_)));
    }

    #[test]
    fn test_builder() {
        let config = HyperparameterConfig::new()
            .with_param("K-Neighbors Regressor", "n_neighbors", vec![3i64.into(), 5i64.into()]);
        assert_eq!(config.grid("K-Neighbors Regressor").unwrap()["n_neighbors"].len(), 2);
    }
}
