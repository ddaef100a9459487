//! One-hot encoding of categorical columns

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, ScorelineError};

/// Behaviour for categories not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownCategory {
    /// Fail the transform
    #[default]
    Error,
    /// Encode as all zeros
    Ignore,
}

/// Sorted categories of one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnCategories {
    column: String,
    categories: Vec<String>,
}

/// One-hot encoder. Categories are sorted, so the output layout does not
/// depend on row order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: UnknownCategory,
    columns: Vec<ColumnCategories>,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: UnknownCategory) -> Self {
        Self {
            handle_unknown,
            columns: Vec::new(),
        }
    }

    /// Learn the categories of one column. Columns are encoded in fit order.
    pub fn fit_column(&mut self, column: &str, values: &[String]) {
        let categories: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let entry = ColumnCategories {
            column: column.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        };
        match self.columns.iter_mut().find(|c| c.column == column) {
            Some(existing) => *existing = entry,
            None => self.columns.push(entry),
        }
    }

    /// Encode `values` of `column` into a `(rows, n_categories)` block
    pub fn transform_column(&self, column: &str, values: &[String]) -> Result<Array2<f64>> {
        let cats = self
            .columns
            .iter()
            .find(|c| c.column == column)
            .ok_or(ScorelineError::ModelNotFitted)?;

        let mut block = Array2::zeros((values.len(), cats.categories.len()));
        for (row, value) in values.iter().enumerate() {
            match cats.categories.binary_search_by(|c| c.as_str().cmp(value.as_str())) {
                Ok(idx) => block[[row, idx]] = 1.0,
                Err(_) => {
                    if self.handle_unknown == UnknownCategory::Error {
                        return Err(ScorelineError::Preprocessing(format!(
                            "unknown category '{}' in column '{}'",
                            value, column
                        )));
                    }
                }
            }
        }
        Ok(block)
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.categories.as_slice())
    }

    /// Output names as `column_category`, in encoding order
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.categories.iter().map(move |cat| format!("{}_{}", c.column, cat)))
            .collect()
    }

    pub fn n_features_out(&self) -> usize {
        self.columns.iter().map(|c| c.categories.len()).sum()
    }
}
