//! Column-aware preprocessor: DataFrame in, numeric matrix out

use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::column::{is_categorical_dtype, is_numeric_dtype, numeric_values, string_values};
use super::{Imputer, OneHotEncoder, PreprocessingConfig, StandardScaler};
use crate::error::{Result, ScorelineError};
use crate::export::Artifact;

/// Fitted feature transform.
///
/// Numeric columns are imputed then standardized; categorical columns are
/// imputed, one-hot encoded and scaled. The output places the numeric block
/// first, then the encoded block, each in configured column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    encoder: OneHotEncoder,
    numeric_scaler: Option<StandardScaler>,
    categorical_scaler: Option<StandardScaler>,
    is_fitted: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessingConfig::default())
    }
}

impl Artifact for Preprocessor {
    const KIND: &'static str = "preprocessor";
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self {
            numeric_imputer: Imputer::new(config.numeric_impute_strategy),
            categorical_imputer: Imputer::new(config.categorical_impute_strategy),
            encoder: OneHotEncoder::new(config.handle_unknown),
            config,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            numeric_scaler: None,
            categorical_scaler: None,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if df.height() == 0 {
            return Err(ScorelineError::Preprocessing(
                "cannot fit a preprocessor on an empty frame".to_string(),
            ));
        }
        self.resolve_columns(df)?;
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(ScorelineError::Preprocessing("no feature columns to transform".to_string()));
        }

        self.numeric_imputer = Imputer::new(self.config.numeric_impute_strategy);
        self.categorical_imputer = Imputer::new(self.config.categorical_impute_strategy);
        self.encoder = OneHotEncoder::new(self.config.handle_unknown);

        for name in &self.numeric_columns {
            let values = numeric_values(df, name)?;
            self.numeric_imputer.fit_numeric(name, &values)?;
        }
        for name in &self.categorical_columns {
            let values = string_values(df, name)?;
            self.categorical_imputer.fit_categorical(name, &values)?;
            let filled = self.categorical_imputer.transform_categorical(name, &values)?;
            self.encoder.fit_column(name, &filled);
        }

        self.numeric_scaler = None;
        self.categorical_scaler = None;
        if self.config.scale_numeric && !self.numeric_columns.is_empty() {
            let block = self.numeric_block(df)?;
            let mut scaler = StandardScaler::new(true);
            scaler.fit(&block)?;
            self.numeric_scaler = Some(scaler);
        }
        if self.config.scale_categorical && !self.categorical_columns.is_empty() {
            let block = self.categorical_block(df)?;
            let mut scaler = StandardScaler::new(false);
            scaler.fit(&block)?;
            self.categorical_scaler = Some(scaler);
        }

        self.is_fitted = true;
        debug!(
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            features_out = self.n_features_out(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform rows into the fitted feature layout. Extra columns are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScorelineError::ModelNotFitted);
        }

        let mut numeric = self.numeric_block(df)?;
        if let Some(scaler) = &self.numeric_scaler {
            numeric = scaler.transform(&numeric)?;
        }
        let mut categorical = self.categorical_block(df)?;
        if let Some(scaler) = &self.categorical_scaler {
            categorical = scaler.transform(&categorical)?;
        }

        Ok(concatenate(Axis(1), &[numeric.view(), categorical.view()])?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Names of the output columns
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        names.extend(self.encoder.feature_names());
        names
    }

    pub fn n_features_out(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_features_out()
    }

    fn resolve_columns(&mut self, df: &DataFrame) -> Result<()> {
        match (&self.config.numeric_columns, &self.config.categorical_columns) {
            (Some(numeric), Some(categorical)) => {
                self.numeric_columns = numeric.clone();
                self.categorical_columns = categorical.clone();
            }
            (numeric, categorical) => {
                let mut inferred_numeric = Vec::new();
                let mut inferred_categorical = Vec::new();
                for col in df.get_columns() {
                    let name = col.name().to_string();
                    if is_numeric_dtype(col.dtype()) {
                        inferred_numeric.push(name);
                    } else if is_categorical_dtype(col.dtype()) {
                        inferred_categorical.push(name);
                    }
                }
                self.numeric_columns = numeric.clone().unwrap_or(inferred_numeric);
                self.categorical_columns = categorical.clone().unwrap_or(inferred_categorical);
            }
        }

        if let Some(dup) = self
            .numeric_columns
            .iter()
            .find(|c| self.categorical_columns.contains(c))
        {
            return Err(ScorelineError::Configuration(format!(
                "column '{}' is listed as both numeric and categorical",
                dup
            )));
        }
        Ok(())
    }

    fn numeric_block(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut block = Array2::zeros((df.height(), self.numeric_columns.len()));
        for (j, name) in self.numeric_columns.iter().enumerate() {
            let values = numeric_values(df, name)?;
            let filled = self.numeric_imputer.transform_numeric(name, &values)?;
            for (i, v) in filled.into_iter().enumerate() {
                block[[i, j]] = v;
            }
        }
        Ok(block)
    }

    fn categorical_block(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut blocks = Vec::with_capacity(self.categorical_columns.len());
        for name in &self.categorical_columns {
            let values = string_values(df, name)?;
            let filled = self.categorical_imputer.transform_categorical(name, &values)?;
            blocks.push(self.encoder.transform_column(name, &filled)?);
        }
        if blocks.is_empty() {
            return Ok(Array2::zeros((df.height(), 0)));
        }
        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        Ok(concatenate(Axis(1), &views)?)
    }
}
