//! Fit the preprocessor and build train/test arrays with the target last

use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ingestion::load_csv;
use crate::error::{Result, ScorelineError};
use crate::export::ObjectStore;
use crate::preprocessing::{numeric_values, PreprocessingConfig, Preprocessor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    pub preprocessor_path: PathBuf,
    pub target_column: String,
    pub preprocessing: PreprocessingConfig,
}

impl Default for DataTransformationConfig {
    fn default() -> Self {
        Self {
            preprocessor_path: PathBuf::from("artifacts").join("preprocessor.pkl"),
            target_column: "math_score".to_string(),
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl DataTransformationConfig {
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_preprocessor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preprocessor_path = path.into();
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }
}

/// Output of a transformation run
#[derive(Debug, Clone)]
pub struct TransformedData {
    /// Features then target
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub preprocessor_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct DataTransformation {
    config: DataTransformationConfig,
    store: ObjectStore,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self {
            config,
            store: ObjectStore::new(),
        }
    }

    pub fn config(&self) -> &DataTransformationConfig {
        &self.config
    }

    /// Load the CSVs written by ingestion, then [`transform_frames`](Self::transform_frames).
    pub fn initiate_data_transformation(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> Result<TransformedData> {
        let train_df = load_csv(train_path)?;
        let test_df = load_csv(test_path)?;
        self.transform_frames(&train_df, &test_df)
    }

    /// Fit the preprocessor on the train features only, transform both
    /// frames, append the target column and persist the preprocessor.
    pub fn transform_frames(&self, train_df: &DataFrame, test_df: &DataFrame) -> Result<TransformedData> {
        let target = self.config.target_column.as_str();
        let (train_features, train_target) = split_target(train_df, target)?;
        let (test_features, test_target) = split_target(test_df, target)?;

        let mut preprocessor = Preprocessor::new(self.config.preprocessing.clone());
        let x_train = preprocessor.fit_transform(&train_features)?;
        let x_test = preprocessor.transform(&test_features)?;
        info!(
            target,
            features_in = train_features.width(),
            features_out = preprocessor.n_features_out(),
            "Preprocessor fitted on training data"
        );

        self.store.save(&self.config.preprocessor_path, &preprocessor)?;

        Ok(TransformedData {
            train: append_column(&x_train, &train_target)?,
            test: append_column(&x_test, &test_target)?,
            preprocessor_path: self.config.preprocessor_path.clone(),
        })
    }
}

fn split_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Array1<f64>)> {
    let values = numeric_values(df, target)?;
    let y = values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| ScorelineError::Data(format!("target column '{}' has missing values", target)))?;
    let features = df.drop(target)?;
    Ok((features, Array1::from_vec(y)))
}

fn append_column(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
    let y_col = y.view().insert_axis(Axis(1));
    Ok(concatenate(Axis(1), &[x.view(), y_col])?)
}
