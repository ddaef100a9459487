//! Reload persisted artifacts and predict

use ndarray::Array1;
use polars::prelude::DataFrame;
use tracing::info;

use super::config::PredictConfig;
use super::record::{records_to_dataframe, StudentRecord};
use crate::error::Result;
use crate::export::ObjectStore;
use crate::preprocessing::Preprocessor;
use crate::training::{Estimator, Regressor};

/// Serves predictions from `model.pkl` and `preprocessor.pkl`.
///
/// Artifacts are read on every call, so a retrain is picked up without
/// restarting. Use [`load`](Self::load) to keep them in memory instead.
#[derive(Debug, Clone, Default)]
pub struct PredictPipeline {
    config: PredictConfig,
    store: ObjectStore,
}

/// Preprocessor and model held in memory
#[derive(Debug, Clone)]
pub struct LoadedPipeline {
    pub preprocessor: Preprocessor,
    pub model: Estimator,
}

impl LoadedPipeline {
    /// One prediction per input row, in input order
    pub fn predict(&self, features: &DataFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(features)?;
        self.model.predict(&x)
    }
}

impl PredictPipeline {
    pub fn new(config: PredictConfig) -> Self {
        Self {
            config,
            store: ObjectStore::new(),
        }
    }

    pub fn config(&self) -> &PredictConfig {
        &self.config
    }

    pub fn load(&self) -> Result<LoadedPipeline> {
        let model: Estimator = self.store.load(&self.config.model_path)?;
        let preprocessor: Preprocessor = self.store.load(&self.config.preprocessor_path)?;
        info!(
            model = model.family(),
            features = preprocessor.n_features_out(),
            "Loaded prediction artifacts"
        );
        Ok(LoadedPipeline { preprocessor, model })
    }

    pub fn predict(&self, features: &DataFrame) -> Result<Array1<f64>> {
        self.load()?.predict(features)
    }

    pub fn predict_records(&self, records: &[StudentRecord]) -> Result<Array1<f64>> {
        let df = records_to_dataframe(records)?;
        self.predict(&df)
    }
}
