//! Preprocessing configuration

use serde::{Deserialize, Serialize};

use super::{ImputeStrategy, UnknownCategory};

/// Configuration for the feature preprocessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Numeric feature columns. `None` infers them from the column dtypes.
    pub numeric_columns: Option<Vec<String>>,

    /// Categorical feature columns. `None` infers them from the column dtypes.
    pub categorical_columns: Option<Vec<String>>,

    /// Strategy for missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Strategy for missing categorical values
    pub categorical_impute_strategy: ImputeStrategy,

    /// Standardize numeric columns to zero mean and unit variance
    pub scale_numeric: bool,

    /// Divide one-hot columns by their standard deviation (no centering)
    pub scale_categorical: bool,

    /// What to do with categories not seen during fit
    pub handle_unknown: UnknownCategory,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            numeric_columns: None,
            categorical_columns: None,
            numeric_impute_strategy: ImputeStrategy::Median,
            categorical_impute_strategy: ImputeStrategy::MostFrequent,
            scale_numeric: true,
            scale_categorical: true,
            handle_unknown: UnknownCategory::Error,
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.numeric_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categorical_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categorical_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute_strategy = strategy;
        self
    }

    pub fn with_scaling(mut self, numeric: bool, categorical: bool) -> Self {
        self.scale_numeric = numeric;
        self.scale_categorical = categorical;
        self
    }

    pub fn with_handle_unknown(mut self, handle: UnknownCategory) -> Self {
        self.handle_unknown = handle;
        self
    }
}
