//! Prediction configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Artifact locations read by the prediction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self::in_dir("artifacts")
    }
}

impl PredictConfig {
    /// `model.pkl` and `preprocessor.pkl` under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join("model.pkl"),
            preprocessor_path: dir.join("preprocessor.pkl"),
        }
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_preprocessor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preprocessor_path = path.into();
        self
    }
}
